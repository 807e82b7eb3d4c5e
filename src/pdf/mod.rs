//! PDF rendering: the paginated canvas and the activity report drawn on it.

pub mod canvas;
pub mod fonts;
pub mod images;
pub mod photos;
pub mod report;
pub mod table;
pub mod text_layout;

pub use canvas::{BrandingAssets, Canvas, CanvasError, PageGeometry};
pub use photos::PhotoStore;
pub use report::{ActivityReport, CoverPage, DayTable, DayTableStats};
