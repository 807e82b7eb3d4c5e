//! Cover page and per-day activity tables drawn on a [`Canvas`]. Callers
//! hand in text that already went through the normalizer.

use super::canvas::{Align, Canvas, CanvasError, CellOptions, Rgb, TextFrame};
use super::fonts::Font;
use super::photos::PhotoStore;
use super::table::{
    self, layout_photos, needs_page_break, ColumnKind, PhotoSource, RowLayout, TableColumns,
    HEADER_FONT, HEADER_FONT_SIZE, HEADER_ROW_HEIGHT, LINE_HEIGHT, MIN_ROW_ALLOWANCE,
};
use crate::config::ContractProfile;
use crate::ledger::ActivityRecord;
use crate::locale;
use chrono::{Datelike, NaiveDate};
use std::path::Path;

pub const REPORT_TITLE: &str = "INFORME GENERAL DE ACTIVIDADES EJECUTADAS";
pub const SERVICE_DESCRIPTION_LABEL: &str = "Descripción del servicio:";

const COVER_TITLE_OFFSET: f32 = 6.0;
const SECTION_OFFSET: f32 = 10.0;
const HEADER_ROW_GAP: f32 = 4.0;
const HEADER_FILL: Rgb = Rgb::gray(230);
const SEPARATOR_COLOR: Rgb = Rgb::gray(180);

#[derive(Debug, Clone)]
pub struct CoverPage<'a> {
    pub year: i32,
    pub month_name: &'a str,
    pub previous_month_name: &'a str,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub summary: &'a str,
    pub contract: &'a ContractProfile,
}

impl CoverPage<'_> {
    pub fn period_line(&self) -> String {
        format!(
            "Periodo reportado: Del {} de {} al {} de {} de {}",
            self.first_day.day(),
            self.previous_month_name,
            self.last_day.day(),
            self.month_name,
            self.year
        )
    }
}

#[derive(Debug, Clone)]
pub struct DayTable<'a> {
    pub sequence: usize,
    pub year: i32,
    pub date: NaiveDate,
    pub records: &'a [&'a ActivityRecord],
    pub service_description: Option<&'a str>,
    pub new_page: bool,
}

impl DayTable<'_> {
    /// `DÍA 9 - Lunes 3 de noviembre de 2025`
    pub fn title(&self) -> String {
        format!(
            "DÍA {} - {} {} de {} de {}",
            self.sequence,
            locale::capitalize(locale::weekday_name(self.date.weekday())),
            self.date.day(),
            locale::month_name(self.date.month()).unwrap_or_default(),
            self.year
        )
    }

    pub fn total(&self) -> f64 {
        self.records.iter().map(|record| record.total_value).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTableStats {
    pub rows: usize,
    pub photos: usize,
    pub page_breaks: usize,
    pub total: f64,
}

/// Activity Table Renderer: owns the canvas for the duration of a run.
#[derive(Debug)]
pub struct ActivityReport {
    canvas: Canvas,
    columns: TableColumns,
    photos: PhotoStore,
}

impl ActivityReport {
    pub fn new(canvas: Canvas, photos: PhotoStore) -> Self {
        let geometry = *canvas.geometry();
        Self {
            columns: TableColumns::for_width(geometry.margin_left, geometry.usable_width()),
            canvas,
            photos,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn columns(&self) -> &TableColumns {
        &self.columns
    }

    pub fn render_cover(&mut self, cover: &CoverPage<'_>) {
        let geometry = *self.canvas.geometry();
        let canvas = &mut self.canvas;

        canvas.set_y(geometry.content_top() + COVER_TITLE_OFFSET);
        canvas.set_text_color(Rgb::BLACK);
        canvas.set_font(Font::Bold, 14.0);
        canvas.cell(
            0.0,
            10.0,
            REPORT_TITLE,
            CellOptions {
                align: Align::Center,
                line_break: true,
                ..CellOptions::default()
            },
        );
        canvas.ln(2.0);

        let info = [
            format!("Servicio: {}", cover.contract.service),
            format!("Lugar de ejecución: {}", cover.contract.site),
            format!("Contratista: {}", cover.contract.contractor),
            cover.period_line(),
        ]
        .join("\n");
        canvas.set_font(Font::Regular, 10.0);
        canvas.write_text(0.0, 7.0, &info, Align::Left);

        canvas.ln(3.0);
        let y = canvas.cursor().y;
        canvas.set_draw_color(SEPARATOR_COLOR);
        canvas.line(geometry.margin_left, y, geometry.right_edge(), y);
        canvas.set_draw_color(Rgb::BLACK);
        canvas.ln(5.0);

        canvas.set_font(Font::Regular, 10.0);
        canvas.write_text(0.0, 6.0, cover.summary, Align::Justify);
    }

    pub fn render_day_table(&mut self, table: &DayTable<'_>) -> DayTableStats {
        let mut stats = DayTableStats {
            total: table.total(),
            ..DayTableStats::default()
        };

        if table.new_page {
            self.canvas.add_page();
        }
        let y = self.canvas.cursor().y;
        self.canvas.set_y(y + SECTION_OFFSET);
        self.canvas.set_text_color(Rgb::BLACK);
        self.canvas.set_draw_color(Rgb::BLACK);

        self.canvas.set_font(Font::Bold, 11.0);
        self.canvas.cell(
            0.0,
            8.0,
            &table.title(),
            CellOptions {
                line_break: true,
                ..CellOptions::default()
            },
        );

        let description = match table.service_description.map(str::trim) {
            Some(text) if !text.is_empty() => format!("{SERVICE_DESCRIPTION_LABEL} {text}"),
            _ => SERVICE_DESCRIPTION_LABEL.to_string(),
        };
        self.canvas.set_font(Font::Regular, 9.0);
        self.canvas.write_text(0.0, 5.0, &description, Align::Left);

        self.canvas.ln(2.0);
        self.canvas.set_font(Font::Bold, 9.0);
        self.canvas.cell(
            0.0,
            6.0,
            &format!(
                "ACTIVIDADES EJECUTADAS - TOTAL: {}",
                locale::format_currency(stats.total)
            ),
            CellOptions {
                line_break: true,
                ..CellOptions::default()
            },
        );
        self.canvas.ln(2.0);

        // Keep the header row together with at least one row.
        if needs_page_break(
            self.canvas.remaining_height() - HEADER_ROW_GAP - HEADER_ROW_HEIGHT,
            MIN_ROW_ALLOWANCE,
        ) {
            self.canvas.add_page();
            stats.page_breaks += 1;
            self.start_table(SECTION_OFFSET);
        } else {
            self.start_table(HEADER_ROW_GAP);
        }

        for record in table.records {
            let photos = self.resolve_photos(record);
            let layout = RowLayout::plan(record, &self.columns, photos);
            if needs_page_break(self.canvas.remaining_height(), layout.height) {
                self.canvas.add_page();
                stats.page_breaks += 1;
                self.start_table(SECTION_OFFSET);
            }
            stats.photos += self.draw_row(&layout);
            stats.rows += 1;
        }

        tracing::debug!(
            date = %table.date,
            rows = stats.rows,
            photos = stats.photos,
            page_breaks = stats.page_breaks,
            "day table rendered"
        );
        stats
    }

    pub fn save(&mut self, path: &Path) -> Result<(), CanvasError> {
        self.canvas.save(path)
    }

    fn start_table(&mut self, offset: f32) {
        let y = self.canvas.cursor().y + offset;
        self.canvas.set_y(y);
        self.draw_header_row();
    }

    fn draw_header_row(&mut self) {
        let canvas = &mut self.canvas;
        canvas.set_font(HEADER_FONT, HEADER_FONT_SIZE);
        canvas.set_fill_color(HEADER_FILL);
        canvas.set_text_color(Rgb::BLACK);

        let y = canvas.cursor().y;
        for column in self.columns.iter() {
            canvas.set_xy(column.x, y);
            canvas.cell(
                column.width,
                HEADER_ROW_HEIGHT,
                column.kind.label(),
                CellOptions {
                    border: true,
                    fill: true,
                    align: Align::Center,
                    line_break: false,
                },
            );
        }
        canvas.set_y(y + HEADER_ROW_HEIGHT);
    }

    /// Decodes each photo of the record's folder into the canvas registry;
    /// unreadable files are skipped so they take no room in the row.
    fn resolve_photos(&mut self, record: &ActivityRecord) -> Vec<PhotoSource> {
        let Some(id) = record.activity_id.as_deref() else {
            return Vec::new();
        };
        let mut photos = Vec::new();
        for path in self.photos.photos_for(id) {
            match self.canvas.register_image(&path) {
                Ok(info) => photos.push(PhotoSource {
                    aspect_ratio: info.aspect_ratio(),
                    path,
                }),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable photo");
                }
            }
        }
        photos
    }

    /// Draws borders, centred text and photos; returns the photos drawn.
    fn draw_row(&mut self, layout: &RowLayout) -> usize {
        let canvas = &mut self.canvas;
        let y = canvas.cursor().y;

        canvas.set_draw_color(Rgb::BLACK);
        for column in self.columns.iter() {
            canvas.draw_rect(column.x, y, column.width, layout.height);
        }

        canvas.set_font(table::BODY_FONT, table::BODY_FONT_SIZE);
        canvas.set_text_color(Rgb::BLACK);
        let offset = layout.text_offset();
        for cell in &layout.cells {
            canvas.text_block(
                TextFrame {
                    x: cell.column.x,
                    y: y + offset,
                    width: cell.column.width,
                    line_height: LINE_HEIGHT,
                    max_height: layout.height - offset,
                    align: cell.column.kind.align(),
                },
                &cell.text,
            );
        }

        let mut drawn = 0;
        if let Some(column) = self.columns.get(ColumnKind::Photos) {
            let ratios: Vec<f32> = layout.photos.iter().map(|photo| photo.aspect_ratio).collect();
            let placements = layout_photos(&ratios, column.x, column.width, y, layout.height);
            for (photo, placement) in layout.photos.iter().zip(placements) {
                match canvas.draw_image(
                    &photo.path,
                    placement.x,
                    placement.y,
                    placement.width,
                    placement.height,
                ) {
                    Ok(()) => drawn += 1,
                    Err(err) => {
                        tracing::warn!(path = %photo.path.display(), error = %err, "skipping photo that failed to draw");
                    }
                }
            }
        }

        canvas.set_y(y + layout.height);
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UnitOfMeasure;
    use crate::pdf::canvas::tests::branding;
    use crate::pdf::canvas::{DrawOp, PageGeometry};
    use image::RgbImage;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(zone: &str, total: f64, id: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            date: date(2025, 11, 3),
            zone: zone.to_string(),
            item: None,
            description: "Limpieza de canales y bajantes".to_string(),
            unit: UnitOfMeasure::Linear,
            quantity: 10.0,
            unit_price: total / 10.0,
            total_value: total,
            activity_type: "CUBIERTAS".to_string(),
            activity_id: id.map(str::to_string),
        }
    }

    fn report() -> (TempDir, ActivityReport) {
        let (dir, assets) = branding();
        let canvas = Canvas::begin_document(PageGeometry::oficio_landscape(), &assets, 1600)
            .expect("canvas");
        let photos = PhotoStore::new(dir.path().join("fotos"));
        (dir, ActivityReport::new(canvas, photos))
    }

    fn all_texts(report: &ActivityReport) -> Vec<String> {
        report
            .canvas()
            .pages()
            .iter()
            .flat_map(|page| page.texts().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn cover_lists_contract_period_and_summary() {
        let (_dir, mut report) = report();
        let contract = ContractProfile::default();
        report.render_cover(&CoverPage {
            year: 2025,
            month_name: "noviembre",
            previous_month_name: "octubre",
            first_day: date(2025, 10, 26),
            last_day: date(2025, 11, 25),
            summary: "Durante el periodo se ejecutaron 3 actividades.",
            contract: &contract,
        });

        let texts = all_texts(&report);
        assert_eq!(texts[0], REPORT_TITLE);
        assert!(texts.contains(&"Contratista: ALFA MONTAJES Y CUBIERTAS S.A.S.".to_string()));
        assert!(texts
            .contains(&"Periodo reportado: Del 26 de octubre al 25 de noviembre de 2025".to_string()));
        assert!(texts.contains(&"Durante el periodo se ejecutaron 3 actividades.".to_string()));
        assert_eq!(report.canvas().page_count(), 1);
    }

    #[test]
    fn day_table_shows_title_total_and_one_row_per_record() {
        let (_dir, mut report) = report();
        let records = [
            record("Muelle 1", 60_000.0, None),
            record("Muelle 1", 40_000.0, None),
            record("Muelle 2", 50_000.0, None),
        ];
        let refs: Vec<&ActivityRecord> = records.iter().collect();
        let stats = report.render_day_table(&DayTable {
            sequence: 9,
            year: 2025,
            date: date(2025, 11, 3),
            records: &refs,
            service_description: Some("Se atendieron los muelles."),
            new_page: true,
        });

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.total, 150_000.0);
        assert_eq!(report.canvas().page_count(), 2);

        let page: Vec<&str> = report.canvas().pages()[1].texts().collect();
        assert!(page.contains(&"DÍA 9 - Lunes 3 de noviembre de 2025"));
        assert!(page.contains(&"Descripción del servicio: Se atendieron los muelles."));
        assert!(page.contains(&"ACTIVIDADES EJECUTADAS - TOTAL: $150.000"));
        assert_eq!(page.iter().filter(|text| **text == "Muelle 1").count(), 2);
        assert_eq!(page.iter().filter(|text| **text == "Muelle 2").count(), 1);
        assert_eq!(page.iter().filter(|text| **text == "Fecha").count(), 1);
        assert!(page.contains(&"60.000"));
    }

    #[test]
    fn missing_narrative_prints_only_the_label() {
        let (_dir, mut report) = report();
        report.render_day_table(&DayTable {
            sequence: 1,
            year: 2025,
            date: date(2025, 10, 26),
            records: &[],
            service_description: None,
            new_page: false,
        });
        let texts = all_texts(&report);
        assert!(texts.contains(&SERVICE_DESCRIPTION_LABEL.to_string()));
        assert!(texts.contains(&"ACTIVIDADES EJECUTADAS - TOTAL: $0".to_string()));
        assert_eq!(report.canvas().page_count(), 1);
    }

    #[test]
    fn photos_are_embedded_and_broken_ones_skipped() {
        let (dir, mut report) = report();
        let folder = dir.path().join("fotos").join("17");
        std::fs::create_dir_all(&folder).expect("photo folder");
        RgbImage::new(160, 120).save(folder.join("a.png")).expect("photo a");
        RgbImage::new(90, 160).save(folder.join("b.png")).expect("photo b");
        std::fs::write(folder.join("c.jpg"), b"garbage").expect("photo c");

        let records = [record("Muelle 1", 10_000.0, Some("17"))];
        let refs: Vec<&ActivityRecord> = records.iter().collect();
        let stats = report.render_day_table(&DayTable {
            sequence: 1,
            year: 2025,
            date: date(2025, 11, 3),
            records: &refs,
            service_description: None,
            new_page: false,
        });
        assert_eq!(stats.photos, 2);

        let page = &report.canvas().pages()[0];
        // Header banner plus two photos; the footer is added on close.
        assert_eq!(page.image_count(), 3);

        let photo_column = *report.columns().get(ColumnKind::Photos).expect("column");
        for op in page.ops().iter().skip(1) {
            if let DrawOp::Image { x, width, height, .. } = op {
                assert!(*x >= photo_column.x);
                assert!(*x + *width <= photo_column.x + photo_column.width + 1e-3);
                assert!(*height <= table::MIN_PHOTO_ROW_HEIGHT);
            }
        }
    }

    #[test]
    fn photos_that_fail_to_decode_take_no_room() {
        let (dir, mut report) = report();
        let folder = dir.path().join("fotos").join("21");
        std::fs::create_dir_all(&folder).expect("photo folder");
        RgbImage::new(160, 120).save(folder.join("a.png")).expect("photo a");
        let whole = folder.join("b.png");
        RgbImage::new(90, 160).save(&whole).expect("photo b");
        // Cut inside the pixel data: the size is readable, the pixels are not.
        let bytes = std::fs::read(&whole).expect("read b");
        let pixels = bytes
            .windows(4)
            .position(|chunk| chunk == b"IDAT")
            .expect("pixel chunk");
        std::fs::write(&whole, &bytes[..pixels + 8]).expect("truncate b");
        assert_eq!(
            image::image_dimensions(&whole).expect("header still readable"),
            (90, 160)
        );

        let record = record("Muelle 1", 10_000.0, Some("21"));
        let photos = report.resolve_photos(&record);
        assert_eq!(photos.len(), 1);
        assert!(photos[0].path.ends_with("a.png"));

        let refs = [&record];
        let stats = report.render_day_table(&DayTable {
            sequence: 1,
            year: 2025,
            date: date(2025, 11, 3),
            records: &refs,
            service_description: None,
            new_page: false,
        });
        assert_eq!(stats.photos, 1);
        assert_eq!(report.canvas().pages()[0].image_count(), 2);
    }

    #[test]
    fn long_days_break_pages_and_repeat_the_header() {
        let (_dir, mut report) = report();
        let records: Vec<ActivityRecord> = (0..60)
            .map(|index| record(&format!("Zona {index}"), 1_000.0, None))
            .collect();
        let refs: Vec<&ActivityRecord> = records.iter().collect();
        let stats = report.render_day_table(&DayTable {
            sequence: 2,
            year: 2025,
            date: date(2025, 10, 27),
            records: &refs,
            service_description: None,
            new_page: true,
        });

        assert_eq!(stats.rows, 60);
        assert!(stats.page_breaks >= 1);
        let pages = report.canvas().pages();
        assert_eq!(pages.len(), 2 + stats.page_breaks);

        let bottom = report.canvas().geometry().content_bottom();
        for page in &pages[1..] {
            assert_eq!(page.texts().filter(|text| *text == "Fecha").count(), 1);
            for op in page.ops() {
                if let DrawOp::Rect { y, height, .. } = op {
                    assert!(y + height <= bottom + 1e-3, "row crosses the footer band");
                }
            }
        }
    }
}
