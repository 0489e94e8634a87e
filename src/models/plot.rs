use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Coordinate;

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Plot {
    /// UUID of the plot
    pub id: Uuid,
    /// User-facing auto-incremental plot number
    pub plot_number: u64,
    /// Name of the plot, not unique
    pub name: String,
    /// Slug of the name, used for lookups
    pub slug: String,
    /// Name of the farm the plot belongs to
    pub farm_name: Option<String>,
    /// Crop grown on the plot
    pub crop_type: Option<String>,
    /// Whether a plot manager is assigned
    #[serde(default)]
    pub has_manager: bool,
    /// Closed ring of `[lat, lng]` vertices, in traversal order
    pub coordinates: Vec<Coordinate>,
    /// Surface in hectares, derived from the coordinates on every save
    pub surface_area: Option<f64>,
    /// Created at timestamp of the plot
    pub created_at: Timestamp,
    /// Updated at timestamp of the plot
    pub updated_at: Timestamp,
}

impl Plot {
    pub fn name_contains(&self, fragment: &str) -> bool {
        self.name.to_lowercase().contains(&fragment.to_lowercase())
    }
}
