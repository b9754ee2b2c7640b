//! Per-tick sample collection.

use crate::link::{Link, Sample, SampleSet};
use crate::source::TelemetrySource;

/// Takes one quality sample per candidate link.
///
/// Links are queried one at a time. A failed read drops that link's vote
/// for the tick; there is no retry until the next tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleCollector;

impl SampleCollector {
    pub fn new() -> Self {
        SampleCollector
    }

    pub async fn collect<T: TelemetrySource>(&self, source: &T, links: &[Link]) -> SampleSet {
        let mut samples = SampleSet::new();
        for link in links {
            match source.quality(link).await {
                Ok(quality) => {
                    samples.insert(
                        link.id.clone(),
                        Sample {
                            link: link.id.clone(),
                            quality,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(link = %link.id, error = %e, "quality read failed, skipping link this tick");
                }
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let values: Vec<String> = samples
                .values()
                .map(|s| format!("{}={}", s.link, s.quality))
                .collect();
            tracing::debug!(samples = %values.join(" "), "collected quality samples");
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkId;
    use crate::memory::MemoryTelemetry;

    #[tokio::test]
    async fn collects_one_sample_per_link() {
        let telemetry = MemoryTelemetry::new(vec![
            Link::new("mdm-0", "wwan0"),
            Link::new("mdm-1", "wwan1"),
        ]);
        telemetry.set_quality("mdm-0", -11);
        telemetry.set_quality("mdm-1", -6);

        let links = telemetry.snapshot_links();
        let samples = SampleCollector::new().collect(&telemetry, &links).await;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[&LinkId::from("mdm-1")].quality, -6);
    }

    #[tokio::test]
    async fn failed_read_is_omitted() {
        let telemetry = MemoryTelemetry::new(vec![
            Link::new("mdm-0", "wwan0"),
            Link::new("mdm-1", "wwan1"),
        ]);
        telemetry.set_quality("mdm-0", -11);
        telemetry.fail_quality("mdm-1");

        let links = telemetry.snapshot_links();
        let samples = SampleCollector::new().collect(&telemetry, &links).await;
        assert_eq!(samples.len(), 1);
        assert!(samples.contains_key(&LinkId::from("mdm-0")));
    }

    #[tokio::test]
    async fn no_links_yields_empty_set() {
        let telemetry = MemoryTelemetry::new(Vec::new());
        let samples = SampleCollector::new().collect(&telemetry, &[]).await;
        assert!(samples.is_empty());
    }
}
