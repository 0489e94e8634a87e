use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;
use slug::slugify;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    geometry::{
        Coordinate,
        area::surface_area_for,
        centroid::{EmptyInputError, centroid},
        validate::{ValidationError, validate},
    },
    models::{plot::Plot, store::Store},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Plot '{0}' not found")]
    PlotNotFound(String),

    #[error("Plot name is ambiguous. Multiple plots found: {}", .0.join(", "))]
    AmbiguousPlotName(Vec<String>),
}

/// Resolves a plot number, a slug or a fragment of a name to a single plot
///
/// A number that matches no plot falls back to slug and name matching.
pub fn find_plot<'a>(store: &'a Store, identifier: &str) -> Result<&'a Plot, LookupError> {
    let identifier = identifier.trim();

    // Every name contains the empty string
    if identifier.is_empty() {
        return Err(LookupError::PlotNotFound(identifier.to_string()));
    }

    if let Some(plot) = identifier
        .parse::<u64>()
        .ok()
        .and_then(|plot_number| store.get_plot_by_number(plot_number))
    {
        return Ok(plot);
    }

    let slug = slugify(identifier);
    let by_slug: Vec<_> = store.plots.iter().filter(|p| p.slug == slug).collect();
    let matching_plots = if by_slug.is_empty() {
        store
            .plots
            .iter()
            .filter(|p| p.name_contains(identifier))
            .collect()
    } else {
        by_slug
    };

    match matching_plots.len() {
        0 => Err(LookupError::PlotNotFound(identifier.to_string())),
        1 => Ok(matching_plots[0]),
        _ => Err(LookupError::AmbiguousPlotName(
            matching_plots
                .iter()
                .map(|p| format!("#{} {}", p.plot_number, p.name))
                .collect(),
        )),
    }
}

/// Derives every computed field right before a plot is committed.
///
/// Whoever persists a plot calls this with the final coordinates, so the
/// stored area always matches the stored ring.
pub fn prepare_for_save(plot: &mut Plot, now: Timestamp) {
    plot.slug = slugify(&plot.name);
    plot.surface_area = surface_area_for(&plot.coordinates);
    plot.updated_at = now;
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CreatePlotError {
    #[error("Plot name cannot be empty")]
    EmptyName,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct CreatePlotParameters {
    pub name: String,
    pub farm_name: Option<String>,
    pub crop_type: Option<String>,
    pub has_manager: bool,
    /// Raw `[[lat, lng], ...]` input, checked before anything is stored
    pub coordinates: Value,
}

pub fn create_plot(
    store: &mut Store,
    storage: &impl Storage,
    parameters: CreatePlotParameters,
) -> Result<Plot, CreatePlotError> {
    let name = non_blank(parameters.name).ok_or(CreatePlotError::EmptyName)?;
    let coordinates = validate(&parameters.coordinates)?;

    let now = Timestamp::now();
    let mut plot = Plot {
        id: Uuid::new_v4(),
        plot_number: 0,
        name,
        slug: String::new(),
        farm_name: parameters.farm_name.and_then(non_blank),
        crop_type: parameters.crop_type.and_then(non_blank),
        has_manager: parameters.has_manager,
        coordinates,
        surface_area: None,
        created_at: now,
        updated_at: now,
    };
    prepare_for_save(&mut plot, now);

    // Number is assigned by the store
    plot.plot_number = store.add_plot(plot.clone());

    storage.save(store)?;

    info!(
        plot_number = plot.plot_number,
        name = %plot.name,
        surface_area = ?plot.surface_area,
        "plot created"
    );
    Ok(plot)
}

#[derive(Debug, Error)]
pub enum UpdatePlotError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Plot name cannot be empty")]
    EmptyName,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Fields left as `None` keep their stored value. Blank farm or crop clears it.
pub struct UpdatePlotParameters {
    pub identifier: String,
    pub name: Option<String>,
    pub farm_name: Option<String>,
    pub crop_type: Option<String>,
    pub has_manager: Option<bool>,
    pub coordinates: Option<Value>,
}

pub fn update_plot(
    store: &mut Store,
    storage: &impl Storage,
    parameters: UpdatePlotParameters,
) -> Result<Plot, UpdatePlotError> {
    let mut updated_plot = find_plot(store, &parameters.identifier)?.clone();

    if let Some(name) = parameters.name {
        updated_plot.name = non_blank(name).ok_or(UpdatePlotError::EmptyName)?;
    }
    if let Some(raw_coordinates) = parameters.coordinates {
        updated_plot.coordinates = validate(&raw_coordinates)?;
    }
    if let Some(farm_name) = parameters.farm_name {
        updated_plot.farm_name = non_blank(farm_name);
    }
    if let Some(crop_type) = parameters.crop_type {
        updated_plot.crop_type = non_blank(crop_type);
    }
    if let Some(has_manager) = parameters.has_manager {
        updated_plot.has_manager = has_manager;
    }

    prepare_for_save(&mut updated_plot, Timestamp::now());

    if let Some(plot) = store.get_plot_mut(updated_plot.id) {
        *plot = updated_plot.clone();
    }

    storage.save(store)?;

    info!(
        plot_number = updated_plot.plot_number,
        name = %updated_plot.name,
        surface_area = ?updated_plot.surface_area,
        "plot updated"
    );
    Ok(updated_plot)
}

#[derive(Debug, Error)]
pub enum DeletePlotError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct DeletePlotParameters {
    pub identifier: String,
}

pub fn delete_plot(
    store: &mut Store,
    storage: &impl Storage,
    parameters: DeletePlotParameters,
) -> Result<Plot, DeletePlotError> {
    let plot_id = find_plot(store, &parameters.identifier)?.id;

    let removed = store
        .remove_plot(plot_id)
        .ok_or_else(|| LookupError::PlotNotFound(parameters.identifier.clone()))?;

    storage.save(store)?;

    info!(plot_number = removed.plot_number, name = %removed.name, "plot deleted");
    Ok(removed)
}

/// Entry of the name listing
#[derive(Debug, Serialize, PartialEq)]
pub struct PlotName {
    pub id: u64,
    pub name: String,
}

pub fn list_names(store: &Store) -> Vec<PlotName> {
    store
        .plots_newest_first()
        .into_iter()
        .map(|p| PlotName {
            id: p.plot_number,
            name: p.name.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct CenterPoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinate> for CenterPoint {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            lat: coordinate.lat,
            lng: coordinate.lng,
        }
    }
}

/// Read-only view of a plot together with its vertex mean
#[derive(Debug, Serialize)]
pub struct PlotCenter {
    pub id: u64,
    pub name: String,
    pub center: CenterPoint,
    pub coordinates: Vec<Coordinate>,
    pub surface_area: Option<f64>,
}

#[derive(Debug, Error)]
pub enum PlotCenterError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    NoCoordinates(#[from] EmptyInputError),
}

pub fn plot_center(store: &Store, identifier: &str) -> Result<PlotCenter, PlotCenterError> {
    let plot = find_plot(store, identifier)?;
    let center = centroid(&plot.coordinates)?;

    debug!(plot_number = plot.plot_number, lat = center.lat, lng = center.lng, "center computed");

    Ok(PlotCenter {
        id: plot.plot_number,
        name: plot.name.clone(),
        center: center.into(),
        coordinates: plot.coordinates.clone(),
        surface_area: plot.surface_area,
    })
}
