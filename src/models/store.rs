use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::plot::Plot;

/// Current schema version
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
pub struct Store {
    pub version: u32,
    /// Number handed to the next created plot
    #[serde(default = "first_plot_number")]
    pub next_plot_number: u64,
    pub plots: Vec<Plot>,
}

fn first_plot_number() -> u64 {
    1
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            next_plot_number: first_plot_number(),
            plots: vec![],
        }
    }
}

impl Store {
    /// Appends the plot, assigning it the next plot number
    pub fn add_plot(&mut self, mut plot: Plot) -> u64 {
        plot.plot_number = self.next_plot_number;
        self.next_plot_number += 1;
        let plot_number = plot.plot_number;
        self.plots.push(plot);
        plot_number
    }

    #[cfg(test)]
    pub fn get_plot(&self, id: Uuid) -> Option<&Plot> {
        self.plots.iter().find(|p| p.id == id)
    }

    pub fn get_plot_mut(&mut self, id: Uuid) -> Option<&mut Plot> {
        self.plots.iter_mut().find(|p| p.id == id)
    }

    pub fn get_plot_by_number(&self, plot_number: u64) -> Option<&Plot> {
        self.plots.iter().find(|p| p.plot_number == plot_number)
    }

    pub fn remove_plot(&mut self, id: Uuid) -> Option<Plot> {
        let position = self.plots.iter().position(|p| p.id == id)?;
        Some(self.plots.remove(position))
    }

    /// Plots ordered by creation time, newest first
    pub fn plots_newest_first(&self) -> Vec<&Plot> {
        let mut plots: Vec<&Plot> = self.plots.iter().collect();
        plots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.plot_number.cmp(&a.plot_number))
        });
        plots
    }
}
