use crate::config::ContractProfile;
use crate::ledger::ActivityDataset;
use crate::locale::format_currency;

const TOP_ZONES: usize = 3;
const HYDROSANITARY_TYPE: &str = "HIDROSANITARIO";
const ROOFING_MARKER: &str = "CUB";

/// Aggregates behind the general summary paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetrics {
    pub total_activities: usize,
    pub distinct_zones: usize,
    pub top_zones: Vec<String>,
    pub hydrosanitary: usize,
    pub roofing: usize,
    pub total_value: f64,
}

impl SummaryMetrics {
    pub fn from_dataset(dataset: &ActivityDataset) -> Self {
        // (zone, count) in order of first appearance
        let mut zone_counts: Vec<(&str, usize)> = Vec::new();
        for record in dataset.records() {
            let zone = record.zone.trim();
            if zone.is_empty() {
                continue;
            }
            match zone_counts.iter_mut().find(|(name, _)| *name == zone) {
                Some((_, count)) => *count += 1,
                None => zone_counts.push((zone, 1)),
            }
        }
        let distinct_zones = zone_counts.len();

        zone_counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top_zones = zone_counts
            .iter()
            .take(TOP_ZONES)
            .map(|(zone, _)| zone.to_string())
            .collect();

        let hydrosanitary = dataset
            .records()
            .iter()
            .filter(|record| record.activity_type.trim() == HYDROSANITARY_TYPE)
            .count();
        let roofing = dataset
            .records()
            .iter()
            .filter(|record| record.activity_type.to_uppercase().contains(ROOFING_MARKER))
            .count();

        Self {
            total_activities: dataset.len(),
            distinct_zones,
            top_zones,
            hydrosanitary,
            roofing,
            total_value: dataset.total_value(),
        }
    }

    fn top_zones_text(&self) -> String {
        match self.top_zones.as_slice() {
            [] => "ninguna zona en particular".to_string(),
            [only] => only.clone(),
            [init @ .., last] => format!("{} y {}", init.join(", "), last),
        }
    }
}

/// Deterministic narrative for the cover page. Never fails and never
/// leaves the process.
pub fn general_summary(dataset: &ActivityDataset, contract: &ContractProfile) -> String {
    let metrics = SummaryMetrics::from_dataset(dataset);
    tracing::debug!(?metrics, "general summary metrics");
    render(&metrics, contract)
}

fn render(metrics: &SummaryMetrics, contract: &ContractProfile) -> String {
    let site = contract.site.trim();
    let paragraphs = [
        format!(
            "Durante el periodo analizado se registraron un total de {} actividades de \
mantenimiento ejecutadas en las instalaciones de la {}. Estas intervenciones se llevaron a \
cabo en {} zonas operativas, entre las cuales destacan {}, por su mayor volumen de \
requerimientos.",
            metrics.total_activities,
            site,
            metrics.distinct_zones,
            metrics.top_zones_text()
        ),
        "Las labores ejecutadas se concentraron principalmente en las siguientes categorías:"
            .to_string(),
        format!(
            "- Actividades hidrosanitarias: {} intervenciones.\n- Actividades en cubiertas: {} intervenciones.",
            metrics.hydrosanitary, metrics.roofing
        ),
        "Las acciones desarrolladas permitieron mantener la continuidad operativa de las áreas \
intervenidas, contribuyendo a la estabilización operativa de zonas críticas y la reducción de \
eventos por filtraciones e incidencias hidrosanitarias."
            .to_string(),
        format!(
            "El valor total ejecutado durante el periodo asciende a {}, reflejando el volumen \
de trabajo realizado y la atención oportuna de los requerimientos reportados.",
            format_currency(metrics.total_value)
        ),
        format!(
            "En conclusión, la gestión adelantada por {} durante el periodo garantizó la \
atención de las necesidades de mantenimiento en las zonas concesionadas y externas, \
fortaleciendo la confiabilidad de la infraestructura.",
            contract.contractor.trim()
        ),
    ];
    paragraphs.join("\n\n")
}
