use colored::*;

use crate::{
    models::plot::Plot,
    services::plots::{PlotCenter, PlotName},
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Format a surface area for display (e.g., "1.0038 ha", "no area")
pub fn format_area(surface_area: Option<f64>) -> String {
    match surface_area {
        Some(hectares) => format!("{:.4} ha", hectares),
        None => "no area".to_string(),
    }
}

/// Build the context string for a plot (farm and crop)
/// Returns None if the plot has neither
pub fn get_plot_context(plot: &Plot) -> Option<String> {
    match (&plot.farm_name, &plot.crop_type) {
        (Some(farm), Some(crop)) => Some(format!("{} / {}", farm, crop)),
        (Some(farm), None) => Some(farm.clone()),
        (None, Some(crop)) => Some(crop.clone()),
        (None, None) => None,
    }
}

/// Render a single plot line with number, name, context and right-aligned area
pub fn render_plot_line(plot: &Plot) {
    let terminal_width = get_terminal_width();

    let id_str = format!("{:>3}", plot.plot_number);
    let glyph = if plot.has_manager {
        "●".green()
    } else {
        "○".normal()
    };

    let left_section = match get_plot_context(plot) {
        Some(context) => format!("  {}  {}  {}  {}", id_str, glyph, plot.name, context.dimmed()),
        None => format!("  {}  {}  {}", id_str, glyph, plot.name),
    };
    let left_visible_len = match get_plot_context(plot) {
        Some(context) => format!("  {}  {}  {}  {}", id_str, " ", plot.name, context),
        None => format!("  {}  {}  {}", id_str, " ", plot.name),
    }
    .chars()
    .count();

    let right_section = format_area(plot.surface_area);
    let right_visible_len = right_section.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!(
            "{}{}{}",
            left_section.bold(),
            " ".repeat(padding),
            right_section.cyan()
        );
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}  {}", left_section.bold(), right_section.cyan());
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let plot_word = if count == 1 { "plot" } else { "plots" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, plot_word);
}

/// Render every stored field of a plot
pub fn render_plot_details(plot: &Plot) {
    println!(
        "\n  {} {}\n",
        format!("#{}", plot.plot_number).dimmed(),
        plot.name.cyan().bold()
    );
    println!("    {} {}", "Surface:".dimmed(), format_area(plot.surface_area));
    if let Some(farm) = &plot.farm_name {
        println!("    {} {}", "Farm:".dimmed(), farm);
    }
    if let Some(crop) = &plot.crop_type {
        println!("    {} {}", "Crop:".dimmed(), crop);
    }
    println!(
        "    {} {}",
        "Manager:".dimmed(),
        if plot.has_manager { "yes" } else { "no" }
    );
    println!("    {} {}", "Created:".dimmed(), format_timestamp(plot.created_at));
    println!("    {} {}", "Updated:".dimmed(), format_timestamp(plot.updated_at));

    render_section_header(&format!("{} vertices", plot.coordinates.len()));
    for (index, coordinate) in plot.coordinates.iter().enumerate() {
        println!(
            "    {:>3}  {:>12.6}  {:>12.6}",
            index.to_string().dimmed(),
            coordinate.lat,
            coordinate.lng
        );
    }
    println!();
}

/// Render the name listing
pub fn render_names(names: &[PlotName]) {
    for entry in names {
        println!("  {:>3}  {}", entry.id.to_string().dimmed(), entry.name);
    }
}

/// Render the center view of a plot
pub fn render_center(center: &PlotCenter) {
    println!(
        "\n  {} {}\n",
        format!("#{}", center.id).dimmed(),
        center.name.cyan().bold()
    );
    println!(
        "    {} {:.6}, {:.6}",
        "Center:".dimmed(),
        center.center.lat,
        center.center.lng
    );
    println!("    {} {}", "Surface:".dimmed(), format_area(center.surface_area));
    println!("    {} {}", "Vertices:".dimmed(), center.coordinates.len());
    println!();
}

/// Render a section header (e.g., "4 vertices")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Format a timestamp in the system time zone (e.g., "2025-03-01 14:05")
fn format_timestamp(timestamp: jiff::Timestamp) -> String {
    let zoned = jiff::Zoned::new(timestamp, jiff::tz::TimeZone::system());
    zoned.strftime("%Y-%m-%d %H:%M").to_string()
}
