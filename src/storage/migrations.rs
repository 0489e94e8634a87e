use std::path::Path;

use serde_json::{Map, Value, json};
use slug::slugify;
use tracing::warn;

use crate::{
    geometry::{
        Coordinate,
        area::{legacy_degree_area_hectares, surface_area_for},
    },
    storage::StorageError,
};

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

fn get_migrations() -> Vec<MigrationFn> {
    vec![migrate_v1_to_v2]
}

/// Returns 1 if version field is missing (assumes v1, our first versioned schema)
pub fn detect_version(path: &Path, content: &str) -> Result<u32, StorageError> {
    let value: Value = serde_json::from_str(content).map_err(|e| StorageError::ParseFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    match value.get("version") {
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| StorageError::InvalidVersion {
                path: path.to_path_buf(),
            }),
        None => Ok(1),
    }
}

/// Migrations are applied sequentially: v1→v2→v3→...→target
pub fn apply_migrations(
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    let migrations = get_migrations();

    for version in from_version..to_version {
        // v1→v2 is at index 0
        let migration_idx = version.checked_sub(1).map(|i| i as usize);

        match migration_idx.and_then(|i| migrations.get(i)) {
            Some(migration) => data = migration(data)?,
            None => return Err(StorageError::UnsupportedVersion(version)),
        }
    }

    Ok(data)
}

/// v2 numbers plots, stores slugs and derives areas from the metre projection.
///
/// v1 areas came from a shoelace straight on degrees, so every stored value
/// is recomputed and differences are reported.
fn migrate_v1_to_v2(mut value: Value) -> Result<Value, StorageError> {
    let failed = |reason: &str| StorageError::MigrationFailed {
        from: 1,
        reason: reason.to_string(),
    };

    let obj = value
        .as_object_mut()
        .ok_or_else(|| failed("store root is not an object"))?;
    obj.insert("version".to_string(), Value::from(2));

    let plots = obj
        .entry("plots")
        .or_insert_with(|| Value::Array(vec![]))
        .as_array_mut()
        .ok_or_else(|| failed("'plots' is not a list"))?;

    // Explicit numbers are kept, missing ones are handed out above all of them
    let mut highest_number: u64 = 0;
    for plot in plots.iter() {
        let plot_obj = plot
            .as_object()
            .ok_or_else(|| failed("a plot entry is not an object"))?;
        if let Some(number) = plot_obj.get("plot_number").and_then(Value::as_u64) {
            highest_number = highest_number.max(number);
        }
    }
    let mut next_plot_number = highest_number.saturating_add(1);

    for plot in plots.iter_mut() {
        let plot_obj = plot
            .as_object_mut()
            .ok_or_else(|| failed("a plot entry is not an object"))?;

        let plot_number = match plot_obj.get("plot_number").and_then(Value::as_u64) {
            Some(number) => number,
            None => {
                let number = next_plot_number;
                plot_obj.insert("plot_number".to_string(), Value::from(number));
                next_plot_number = next_plot_number.saturating_add(1);
                number
            }
        };

        if !plot_obj.contains_key("slug") {
            let name = plot_obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            plot_obj.insert("slug".to_string(), Value::from(slugify(name)));
        }

        plot_obj
            .entry("has_manager")
            .or_insert(Value::Bool(false));

        recompute_surface_area(plot_obj)
            .map_err(|e| failed(&format!("plot {}: {}", plot_number, e)))?;
    }

    let stored_next = obj
        .get("next_plot_number")
        .and_then(Value::as_u64)
        .unwrap_or(1);
    obj.insert(
        "next_plot_number".to_string(),
        Value::from(stored_next.max(next_plot_number)),
    );

    Ok(value)
}

fn recompute_surface_area(plot: &mut Map<String, Value>) -> Result<(), serde_json::Error> {
    let coordinates: Vec<Coordinate> = match plot.get("coordinates") {
        Some(raw) => serde_json::from_value(raw.clone())?,
        None => vec![],
    };

    let stored = plot.get("surface_area").and_then(Value::as_f64);
    let recomputed = surface_area_for(&coordinates);

    if stored != recomputed {
        let name = plot
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        warn!(
            plot = name,
            stored = ?stored,
            recomputed = ?recomputed,
            legacy = legacy_degree_area_hectares(&coordinates),
            "surface area changed while upgrading store"
        );
    }

    plot.insert("surface_area".to_string(), json!(recomputed));
    Ok(())
}
