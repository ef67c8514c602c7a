//! Publisher pipeline and output counters from the `libbeat` section

use super::{labeled, single, MetricEntry, MetricKind, Reader};

const SUBSYSTEM: &str = "libbeat";

fn group(
    namespace: &str,
    name: &str,
    label: &str,
    readers: &[(&str, Reader)],
) -> Vec<MetricEntry<'static>> {
    let help = format!("libbeat.{}", name.replace('_', "."));
    labeled(namespace, SUBSYSTEM, name, &help, MetricKind::Untyped, label, readers)
}

pub(super) fn catalog(namespace: &str) -> Vec<MetricEntry<'static>> {
    let config: [(&str, Reader); 4] = [
        ("running", |s| s.libbeat.config.module.running),
        ("starts", |s| s.libbeat.config.module.starts),
        ("stops", |s| s.libbeat.config.module.stops),
        ("reloads", |s| s.libbeat.config.reloads),
    ];
    let output_events: [(&str, Reader); 7] = [
        ("acked", |s| s.libbeat.output.events.acked),
        ("active", |s| s.libbeat.output.events.active),
        ("batches", |s| s.libbeat.output.events.batches),
        ("dropped", |s| s.libbeat.output.events.dropped),
        ("duplicates", |s| s.libbeat.output.events.duplicates),
        ("failed", |s| s.libbeat.output.events.failed),
        ("total", |s| s.libbeat.output.events.total),
    ];
    let output_io: [(&str, Reader); 4] = [
        ("read_bytes", |s| s.libbeat.output.read.bytes),
        ("read_errors", |s| s.libbeat.output.read.errors),
        ("write_bytes", |s| s.libbeat.output.write.bytes),
        ("write_errors", |s| s.libbeat.output.write.errors),
    ];
    let pipeline_events: [(&str, Reader); 7] = [
        ("active", |s| s.libbeat.pipeline.events.active),
        ("dropped", |s| s.libbeat.pipeline.events.dropped),
        ("failed", |s| s.libbeat.pipeline.events.failed),
        ("filtered", |s| s.libbeat.pipeline.events.filtered),
        ("published", |s| s.libbeat.pipeline.events.published),
        ("retry", |s| s.libbeat.pipeline.events.retry),
        ("total", |s| s.libbeat.pipeline.events.total),
    ];

    let mut catalog = group(namespace, "config", "config", &config);
    catalog.extend(group(namespace, "output_events", "type", &output_events));
    catalog.extend(group(namespace, "output_io", "io", &output_io));
    catalog.push(single(
        namespace,
        SUBSYSTEM,
        "pipeline_clients",
        "libbeat.pipeline.clients",
        MetricKind::Untyped,
        |s| s.libbeat.pipeline.clients,
    ));
    catalog.extend(group(namespace, "pipeline_events", "type", &pipeline_events));
    catalog.push(single(
        namespace,
        SUBSYSTEM,
        "pipeline_queue_acked",
        "libbeat.pipeline.queue.acked",
        MetricKind::Untyped,
        |s| s.libbeat.pipeline.queue.acked,
    ));
    catalog
}
