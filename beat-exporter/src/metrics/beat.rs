//! Process runtime of the beat itself and the host it runs on

use super::{labeled, single, MetricEntry, MetricKind, Reader};

/// cpu, uptime, memstats, handles and goroutines from the `beat` section.
pub(super) fn beat_catalog(namespace: &str) -> Vec<MetricEntry<'static>> {
    let cpu_time: [(&str, Reader); 2] = [
        ("system", |s| s.beat.cpu.system.time.seconds()),
        ("user", |s| s.beat.cpu.user.time.seconds()),
    ];
    let cpu_ticks: [(&str, Reader); 2] = [
        ("system", |s| s.beat.cpu.system.ticks),
        ("user", |s| s.beat.cpu.user.ticks),
    ];
    let memstats: [(&str, Reader); 4] = [
        ("gc_next", |s| s.beat.memstats.gc_next),
        ("memory_alloc", |s| s.beat.memstats.memory_alloc),
        ("memory_total", |s| s.beat.memstats.memory_total),
        ("rss", |s| s.beat.memstats.rss),
    ];
    let handles: [(&str, Reader); 3] = [
        ("open", |s| s.beat.handles.open),
        ("limit_hard", |s| s.beat.handles.limit.hard),
        ("limit_soft", |s| s.beat.handles.limit.soft),
    ];

    let mut catalog = labeled(
        namespace,
        "cpu_time",
        "seconds_total",
        "beat.cpu.time",
        MetricKind::Counter,
        "mode",
        &cpu_time,
    );
    catalog.extend(labeled(
        namespace,
        "cpu",
        "ticks_total",
        "beat.cpu.ticks",
        MetricKind::Counter,
        "mode",
        &cpu_ticks,
    ));
    catalog.push(single(
        namespace,
        "uptime",
        "seconds_total",
        "beat.info.uptime",
        MetricKind::Counter,
        |s| s.beat.info.uptime.seconds(),
    ));
    catalog.extend(labeled(
        namespace,
        "beat",
        "memstats",
        "beat.memstats",
        MetricKind::Gauge,
        "memstats",
        &memstats,
    ));
    catalog.extend(labeled(
        namespace,
        "beat",
        "handles",
        "beat.handles",
        MetricKind::Gauge,
        "handles",
        &handles,
    ));
    catalog.push(single(
        namespace,
        "runtime",
        "goroutines",
        "beat.runtime.goroutines",
        MetricKind::Gauge,
        |s| s.beat.runtime.goroutines,
    ));
    catalog
}

/// Core count and load averages from the `system` section.
pub(super) fn system_catalog(namespace: &str) -> Vec<MetricEntry<'static>> {
    let load: [(&str, Reader); 3] = [
        ("1", |s| s.system.load.one),
        ("5", |s| s.system.load.five),
        ("15", |s| s.system.load.fifteen),
    ];
    let load_norm: [(&str, Reader); 3] = [
        ("1", |s| s.system.load.norm.one),
        ("5", |s| s.system.load.norm.five),
        ("15", |s| s.system.load.norm.fifteen),
    ];

    let mut catalog = vec![single(
        namespace,
        "system",
        "cpu_cores",
        "system.cpu.cores",
        MetricKind::Gauge,
        |s| s.system.cpu.cores,
    )];
    catalog.extend(labeled(
        namespace,
        "system",
        "load",
        "system.load",
        MetricKind::Gauge,
        "period",
        &load,
    ));
    catalog.extend(labeled(
        namespace,
        "system",
        "load_norm",
        "system.load.norm",
        MetricKind::Gauge,
        "period",
        &load_norm,
    ));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StartTimePolicy;
    use crate::models::Stats;

    fn value(catalog: &[MetricEntry], stats: &Stats, name: &str, label: Option<(&str, &str)>) -> f64 {
        catalog
            .iter()
            .find(|e| {
                e.desc.fq_name == name
                    && label.map_or(e.desc.labels.is_empty(), |(k, v)| e.desc.label(k) == Some(v))
            })
            .map(|e| e.eval.evaluate(stats, StartTimePolicy::Strict).unwrap())
            .unwrap()
    }

    #[test]
    fn test_beat_catalog_names_and_values() {
        let mut stats = Stats::default();
        stats.beat.cpu.system.time.ms = 2500.0;
        stats.beat.cpu.user.ticks = 40.0;
        stats.beat.info.uptime.ms = 90_000.0;
        stats.beat.memstats.rss = 4096.0;
        stats.beat.handles.limit.soft = 1024.0;
        stats.beat.runtime.goroutines = 27.0;

        let catalog = beat_catalog("filebeat");
        assert_eq!(catalog.len(), 2 + 2 + 1 + 4 + 3 + 1);
        assert_eq!(
            value(&catalog, &stats, "filebeat_cpu_time_seconds_total", Some(("mode", "system"))),
            2.5
        );
        assert_eq!(
            value(&catalog, &stats, "filebeat_cpu_ticks_total", Some(("mode", "user"))),
            40.0
        );
        assert_eq!(value(&catalog, &stats, "filebeat_uptime_seconds_total", None), 90.0);
        assert_eq!(
            value(&catalog, &stats, "filebeat_beat_memstats", Some(("memstats", "rss"))),
            4096.0
        );
        assert_eq!(
            value(&catalog, &stats, "filebeat_beat_handles", Some(("handles", "limit_soft"))),
            1024.0
        );
        assert_eq!(value(&catalog, &stats, "filebeat_runtime_goroutines", None), 27.0);
    }

    #[test]
    fn test_beat_catalog_kinds() {
        let catalog = beat_catalog("filebeat");
        for entry in &catalog {
            let expected = if entry.desc.fq_name.ends_with("_total") {
                MetricKind::Counter
            } else {
                MetricKind::Gauge
            };
            assert_eq!(entry.desc.kind, expected, "{}", entry.desc.fq_name);
        }
    }

    #[test]
    fn test_system_catalog() {
        let mut stats = Stats::default();
        stats.system.cpu.cores = 8.0;
        stats.system.load.fifteen = 0.75;
        stats.system.load.norm.one = 0.125;

        let catalog = system_catalog("filebeat");
        assert_eq!(catalog.len(), 7);
        assert_eq!(value(&catalog, &stats, "filebeat_system_cpu_cores", None), 8.0);
        assert_eq!(
            value(&catalog, &stats, "filebeat_system_load", Some(("period", "15"))),
            0.75
        );
        assert_eq!(
            value(&catalog, &stats, "filebeat_system_load_norm", Some(("period", "1"))),
            0.125
        );
    }
}
