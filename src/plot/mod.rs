pub mod chart;
pub mod series;

pub use chart::render_line_chart;
pub use series::series_for_key;
