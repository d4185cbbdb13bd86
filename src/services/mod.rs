pub mod analytics_service;
pub mod auth_service;
pub mod availability_service;
pub mod reservation_service;
pub mod space_service;

#[cfg(test)]
pub mod test_support;
