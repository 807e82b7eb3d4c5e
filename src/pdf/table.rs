//! Geometry of the per-day activities table: column descriptors, row-height
//! planning, photo placement and the page-break rule. Everything here is a
//! pure function of its inputs; [`super::report`] does the drawing.

use super::canvas::Align;
use super::fonts::Font;
use super::text_layout::measure_height;
use crate::ledger::ActivityRecord;
use crate::locale;
use std::path::PathBuf;

pub const LINE_HEIGHT: f32 = 5.0;
pub const HEADER_ROW_HEIGHT: f32 = 2.0 * LINE_HEIGHT;
pub const BODY_FONT: Font = Font::Regular;
pub const BODY_FONT_SIZE: f32 = 8.0;
pub const HEADER_FONT: Font = Font::Bold;
pub const HEADER_FONT_SIZE: f32 = 8.0;

/// Rows carrying photos are at least this tall.
pub const MIN_PHOTO_ROW_HEIGHT: f32 = 25.0;
/// No row grows past this height; longer text is cut.
pub const MAX_ROW_HEIGHT: f32 = 80.0;
/// A new row never starts with less space than this left on the page.
pub const MIN_ROW_ALLOWANCE: f32 = 25.0;
pub const MAX_PHOTOS_PER_ROW: usize = 3;
pub const PHOTO_VERTICAL_MARGIN: f32 = 2.0;
pub const PHOTO_SIDE_MARGIN: f32 = 1.0;
pub const PHOTO_GAP: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Zone,
    Description,
    Unit,
    Quantity,
    UnitPrice,
    TotalValue,
    Photos,
}

impl ColumnKind {
    pub const fn ordered() -> [ColumnKind; 8] {
        [
            ColumnKind::Date,
            ColumnKind::Zone,
            ColumnKind::Description,
            ColumnKind::Unit,
            ColumnKind::Quantity,
            ColumnKind::UnitPrice,
            ColumnKind::TotalValue,
            ColumnKind::Photos,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            ColumnKind::Date => "Fecha",
            ColumnKind::Zone => "Área / Ubicación",
            ColumnKind::Description => "Actividad Realizada",
            ColumnKind::Unit => "Unidad",
            ColumnKind::Quantity => "Cantidad",
            ColumnKind::UnitPrice => "Valor Unitario ($)",
            ColumnKind::TotalValue => "Valor Total ($)",
            ColumnKind::Photos => "Fotografías",
        }
    }

    pub const fn align(self) -> Align {
        match self {
            ColumnKind::Zone | ColumnKind::Description => Align::Left,
            _ => Align::Center,
        }
    }

    /// Width in millimetres on a 312 mm wide table.
    const fn nominal_width(self) -> f32 {
        match self {
            ColumnKind::Date => 20.0,
            ColumnKind::Zone => 40.0,
            ColumnKind::Description => 70.0,
            ColumnKind::Unit => 13.0,
            ColumnKind::Quantity => 13.0,
            ColumnKind::UnitPrice => 28.0,
            ColumnKind::TotalValue => 28.0,
            ColumnKind::Photos => 100.0,
        }
    }

    /// Display text of this column for `record`; photos have none.
    pub fn format(self, record: &ActivityRecord) -> String {
        match self {
            ColumnKind::Date => locale::format_day_month_year(record.date),
            ColumnKind::Zone => record.zone.clone(),
            ColumnKind::Description => record.description.clone(),
            ColumnKind::Unit => record.unit.code().to_string(),
            ColumnKind::Quantity => locale::format_quantity(record.quantity),
            ColumnKind::UnitPrice => locale::format_thousands(record.unit_price),
            ColumnKind::TotalValue => locale::format_thousands(record.total_value),
            ColumnKind::Photos => String::new(),
        }
    }
}

const NOMINAL_TABLE_WIDTH: f32 = 312.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub kind: ColumnKind,
    pub x: f32,
    pub width: f32,
}

/// Ordered column descriptors covering the full usable width.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumns {
    columns: Vec<Column>,
}

impl TableColumns {
    /// Scales the nominal widths to `usable_width`; the photographs column
    /// absorbs rounding so the widths always sum to exactly `usable_width`.
    pub fn for_width(left: f32, usable_width: f32) -> Self {
        let scale = usable_width / NOMINAL_TABLE_WIDTH;
        let kinds = ColumnKind::ordered();
        let mut columns = Vec::with_capacity(kinds.len());
        let mut x = left;
        let mut used = 0.0;

        for kind in kinds {
            let width = if kind == ColumnKind::Photos {
                usable_width - used
            } else {
                kind.nominal_width() * scale
            };
            columns.push(Column { kind, x, width });
            x += width;
            used += width;
        }

        Self { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn total_width(&self) -> f32 {
        self.columns.iter().map(|column| column.width).sum()
    }

    pub fn get(&self, kind: ColumnKind) -> Option<&Column> {
        self.columns.iter().find(|column| column.kind == kind)
    }

    pub fn text_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|column| column.kind != ColumnKind::Photos)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellText {
    pub column: Column,
    pub text: String,
    pub height: f32,
}

/// Everything needed to draw one activity row, computed before drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub cells: Vec<CellText>,
    pub text_height: f32,
    pub height: f32,
    pub photos: Vec<PhotoSource>,
}

/// A photo whose pixel size is already known.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSource {
    pub path: PathBuf,
    pub aspect_ratio: f32,
}

impl RowLayout {
    pub fn plan(record: &ActivityRecord, columns: &TableColumns, mut photos: Vec<PhotoSource>) -> Self {
        photos.truncate(MAX_PHOTOS_PER_ROW);

        let cells: Vec<CellText> = columns
            .text_columns()
            .map(|column| {
                let text = column.kind.format(record);
                let height = measure_height(&text, BODY_FONT, BODY_FONT_SIZE, column.width, LINE_HEIGHT);
                CellText {
                    column: *column,
                    text,
                    height,
                }
            })
            .collect();

        let text_height = cells
            .iter()
            .map(|cell| cell.height)
            .fold(LINE_HEIGHT, f32::max);

        Self {
            height: row_height(text_height, photos.len()),
            cells,
            text_height,
            photos,
        }
    }

    /// Top offset that centres the text band inside the row.
    pub fn text_offset(&self) -> f32 {
        ((self.height - self.text_height) / 2.0).max(0.0)
    }
}

/// Text height, raised to the photo minimum when photos exist, then capped.
pub fn row_height(text_height: f32, photo_count: usize) -> f32 {
    let height = if photo_count > 0 {
        text_height.max(MIN_PHOTO_ROW_HEIGHT)
    } else {
        text_height
    };
    height.min(MAX_ROW_HEIGHT)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Places up to three photos at a shared height, right-aligned inside the
/// cell. If their natural widths do not fit, every photo shrinks by the same
/// factor so aspect ratios survive and the strip fills the available width.
pub fn layout_photos(
    aspect_ratios: &[f32],
    cell_x: f32,
    cell_width: f32,
    row_y: f32,
    row_height: f32,
) -> Vec<PhotoPlacement> {
    let ratios: Vec<f32> = aspect_ratios
        .iter()
        .copied()
        .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
        .take(MAX_PHOTOS_PER_ROW)
        .collect();
    if ratios.is_empty() {
        return Vec::new();
    }

    let gaps = PHOTO_GAP * (ratios.len() - 1) as f32;
    let available = (cell_width - 2.0 * PHOTO_SIDE_MARGIN - gaps).max(0.0);
    let mut height = (row_height - 2.0 * PHOTO_VERTICAL_MARGIN).max(0.0);
    let mut widths: Vec<f32> = ratios.iter().map(|ratio| ratio * height).collect();

    let natural: f32 = widths.iter().sum();
    if natural > available && natural > 0.0 {
        let factor = available / natural;
        widths.iter_mut().for_each(|width| *width *= factor);
        height *= factor;
    }

    let strip: f32 = widths.iter().sum::<f32>() + gaps;
    let mut x = cell_x + cell_width - PHOTO_SIDE_MARGIN - strip;
    let y = row_y + (row_height - height) / 2.0;

    widths
        .into_iter()
        .map(|width| {
            let placement = PhotoPlacement {
                x,
                y,
                width,
                height,
            };
            x += width + PHOTO_GAP;
            placement
        })
        .collect()
}

/// Row heights are final before this check, so a row that passes it never
/// crosses the bottom band.
pub fn needs_page_break(remaining: f32, row_height: f32) -> bool {
    remaining < row_height.max(MIN_ROW_ALLOWANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UnitOfMeasure;
    use chrono::NaiveDate;

    fn record(description: &str) -> ActivityRecord {
        ActivityRecord {
            date: NaiveDate::from_ymd_opt(2025, 11, 3).expect("date"),
            zone: "Muelle 1".to_string(),
            item: None,
            description: description.to_string(),
            unit: UnitOfMeasure::Area,
            quantity: 12.5,
            unit_price: 4_800.0,
            total_value: 60_000.0,
            activity_type: "CUBIERTAS".to_string(),
            activity_id: Some("7".to_string()),
        }
    }

    fn photo(ratio: f32) -> PhotoSource {
        PhotoSource {
            path: PathBuf::from(format!("{ratio}.jpg")),
            aspect_ratio: ratio,
        }
    }

    #[test]
    fn columns_fill_the_usable_width_exactly() {
        for usable in [312.0, 250.0, 187.3, 400.0] {
            let columns = TableColumns::for_width(14.0, usable);
            assert_eq!(columns.iter().count(), 8);
            assert!((columns.total_width() - usable).abs() < 1e-3, "{usable}");
            let last = columns.get(ColumnKind::Photos).expect("photos column");
            assert!((last.x + last.width - (14.0 + usable)).abs() < 1e-3);
        }
        let columns = TableColumns::for_width(14.0, 312.0);
        let widths: Vec<f32> = columns.iter().map(|column| column.width).collect();
        assert_eq!(widths, [20.0, 40.0, 70.0, 13.0, 13.0, 28.0, 28.0, 100.0]);
    }

    #[test]
    fn labels_and_formatters_follow_column_order() {
        let columns = TableColumns::for_width(14.0, 312.0);
        let labels: Vec<&str> = columns.iter().map(|column| column.kind.label()).collect();
        assert_eq!(labels[0], "Fecha");
        assert_eq!(labels[7], "Fotografías");

        let record = record("Cambio de teja");
        let texts: Vec<String> = ColumnKind::ordered()
            .iter()
            .map(|kind| kind.format(&record))
            .collect();
        assert_eq!(
            texts,
            ["03-11-2025", "Muelle 1", "Cambio de teja", "M2", "12.5", "4.800", "60.000", ""]
        );
    }

    #[test]
    fn rows_without_photos_use_text_height() {
        let columns = TableColumns::for_width(14.0, 312.0);
        let short = RowLayout::plan(&record("Limpieza"), &columns, Vec::new());
        assert_eq!(short.height, LINE_HEIGHT);
        assert_eq!(short.height, short.text_height);

        let long = RowLayout::plan(&record(&"revisión de canales ".repeat(12)), &columns, Vec::new());
        assert!(long.text_height > LINE_HEIGHT);
        assert_eq!(long.height, long.text_height);
        assert_eq!(long.cells.len(), 7);
    }

    #[test]
    fn rows_with_photos_stay_between_minimum_and_cap() {
        let columns = TableColumns::for_width(14.0, 312.0);
        for count in 1..=5 {
            let photos = (0..count).map(|_| photo(1.5)).collect();
            let row = RowLayout::plan(&record("Limpieza"), &columns, photos);
            assert!(row.height >= MIN_PHOTO_ROW_HEIGHT);
            assert!(row.height <= MAX_ROW_HEIGHT);
            assert_eq!(row.photos.len(), count.min(MAX_PHOTOS_PER_ROW));
        }

        let huge = RowLayout::plan(&record(&"texto ".repeat(400)), &columns, vec![photo(1.0)]);
        assert_eq!(huge.height, MAX_ROW_HEIGHT);
        assert_eq!(row_height(200.0, 0), MAX_ROW_HEIGHT);
    }

    #[test]
    fn photos_share_height_and_fit_when_narrow_enough() {
        let placements = layout_photos(&[1.0, 1.5], 200.0, 100.0, 50.0, 25.0);
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].height, 21.0);
        assert_eq!(placements[1].height, 21.0);
        assert!((placements[0].width - 21.0).abs() < 1e-4);
        assert!((placements[1].width - 31.5).abs() < 1e-4);
        // Right-aligned against the side margin.
        let right = placements[1].x + placements[1].width;
        assert!((right - (300.0 - PHOTO_SIDE_MARGIN)).abs() < 1e-4);
        assert!((placements[1].x - (placements[0].x + placements[0].width + PHOTO_GAP)).abs() < 1e-4);
    }

    #[test]
    fn wide_photos_scale_down_uniformly() {
        let ratios = [4.0, 3.0, 2.0];
        let placements = layout_photos(&ratios, 0.0, 100.0, 0.0, 40.0);
        assert_eq!(placements.len(), 3);

        let available = 100.0 - 2.0 * PHOTO_SIDE_MARGIN - 2.0 * PHOTO_GAP;
        let total: f32 = placements.iter().map(|placement| placement.width).sum();
        assert!((total - available).abs() < 1e-3);

        for (placement, ratio) in placements.iter().zip(ratios) {
            assert!((placement.width / placement.height - ratio).abs() < 1e-4);
            assert!(placement.y >= 0.0 && placement.y + placement.height <= 40.0);
        }
        assert!(placements[0].x >= PHOTO_SIDE_MARGIN - 1e-4);
    }

    #[test]
    fn invalid_ratios_are_ignored_and_extra_photos_dropped() {
        assert!(layout_photos(&[], 0.0, 100.0, 0.0, 30.0).is_empty());
        let placements = layout_photos(&[0.0, 1.0, f32::NAN, 1.0, 1.0, 1.0], 0.0, 100.0, 0.0, 30.0);
        assert_eq!(placements.len(), 3);
    }

    #[test]
    fn page_break_considers_the_full_row_height() {
        assert!(!needs_page_break(30.0, 5.0));
        assert!(needs_page_break(24.0, 5.0));
        assert!(needs_page_break(60.0, 70.0));
        assert!(!needs_page_break(80.0, 80.0));
    }
}
