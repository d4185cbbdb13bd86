// ==================== SPACE CATALOG ====================
// Spaces are created, edited and deactivated by admins; they are never deleted.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{CreateSpaceRequest, Space, SpaceChanges, SpaceType, UpdateSpaceRequest},
    services::auth_service::{require_admin, Caller},
    state::AppState,
    utils::error::{AppError, AppResult},
};

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Space name is required".to_string()));
    }
    Ok(name.to_string())
}

fn check_capacity(capacity: i32) -> AppResult<i32> {
    if capacity < 1 {
        return Err(AppError::InvalidInput("Capacity must be at least 1".to_string()));
    }
    Ok(capacity)
}

fn check_hourly_rate(rate: f64) -> AppResult<f64> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(AppError::InvalidInput(
            "Hourly rate must be a non-negative number".to_string(),
        ));
    }
    Ok(rate)
}

/// Trimmed, non-empty, first occurrence wins.
fn clean_amenities(amenities: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(amenities.len());
    for amenity in amenities.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        if !cleaned.iter().any(|existing| existing == amenity) {
            cleaned.push(amenity.to_string());
        }
    }
    cleaned
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

async fn ensure_name_free(state: &AppState, name: &str, except_id: Option<&str>) -> AppResult<()> {
    if let Some(existing) = state.store.find_active_space_by_name(name).await? {
        if except_id != Some(existing.id.as_str()) {
            return Err(AppError::Conflict(format!(
                "A space named '{}' already exists",
                name
            )));
        }
    }
    Ok(())
}

pub async fn list_spaces(state: &AppState, kind: Option<SpaceType>) -> AppResult<Vec<Space>> {
    state.store.list_active_spaces(kind).await
}

/// Inactive spaces are still returned.
pub async fn get_space(state: &AppState, id: &str) -> AppResult<Space> {
    state
        .store
        .find_space(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Space not found".to_string()))
}

pub async fn create_space(
    state: &AppState,
    caller: &Caller,
    request: &CreateSpaceRequest,
) -> AppResult<Space> {
    let admin = require_admin(caller)?;

    let name = clean_name(&request.name)?;
    let capacity = check_capacity(request.capacity)?;
    let hourly_rate = check_hourly_rate(request.hourly_rate)?;

    ensure_name_free(state, &name, None).await?;

    let now = Utc::now();
    let space = Space {
        id: Uuid::new_v4().to_string(),
        name,
        kind: request.kind,
        capacity,
        amenities: clean_amenities(&request.amenities),
        hourly_rate,
        description: clean_description(request.description.as_deref()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.store.insert_space(&space).await?;
    log::info!("🏢 Space '{}' ({}) created by {}", space.name, space.id, admin.id);

    Ok(space)
}

pub async fn update_space(
    state: &AppState,
    caller: &Caller,
    id: &str,
    request: &UpdateSpaceRequest,
) -> AppResult<Space> {
    let admin = require_admin(caller)?;
    let current = get_space(state, id).await?;

    let mut changes = SpaceChanges::at(Utc::now());
    if let Some(name) = &request.name {
        let name = clean_name(name)?;
        if name != current.name {
            ensure_name_free(state, &name, Some(&current.id)).await?;
            changes.name = Some(name);
        }
    }
    changes.kind = request.kind;
    changes.capacity = request.capacity.map(check_capacity).transpose()?;
    changes.amenities = request.amenities.as_deref().map(clean_amenities);
    changes.hourly_rate = request.hourly_rate.map(check_hourly_rate).transpose()?;
    changes.description = request
        .description
        .as_deref()
        .map(|description| clean_description(Some(description)));

    let space = state
        .store
        .update_space(&current.id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Space not found".to_string()))?;
    log::info!("✏️  Space {} updated by {}", space.id, admin.id);

    Ok(space)
}

/// Logical delete. Calling it on an inactive space is a no-op that still succeeds.
pub async fn deactivate_space(state: &AppState, caller: &Caller, id: &str) -> AppResult<bool> {
    let admin = require_admin(caller)?;
    let space = get_space(state, id).await?;

    if space.is_active {
        state
            .store
            .deactivate_space(&space.id, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Space not found".to_string()))?;
        log::info!("🗄️  Space {} deactivated by {}", space.id, admin.id);
    }

    Ok(true)
}
