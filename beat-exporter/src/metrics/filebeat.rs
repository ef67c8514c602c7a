use super::{labeled, Descriptor, Evaluator, FileField, MetricEntry, MetricKind, Reader};
use crate::models::Stats;
use std::collections::HashSet;

const SUBSYSTEM: &str = "filebeat";
const FILE_SUBSYSTEM: &str = "harvester";

fn group(
    namespace: &str,
    name: &str,
    label: &str,
    readers: &[(&str, Reader)],
) -> Vec<MetricEntry<'static>> {
    let help = format!("filebeat.{name}");
    labeled(namespace, SUBSYSTEM, name, &help, MetricKind::Untyped, label, readers)
}

/// Counters that exist regardless of which files are being harvested.
pub(super) fn fixed_catalog(namespace: &str) -> Vec<MetricEntry<'static>> {
    let events: [(&str, Reader); 3] = [
        ("active", |s| s.filebeat.events.active),
        ("added", |s| s.filebeat.events.added),
        ("done", |s| s.filebeat.events.done),
    ];
    let harvester: [(&str, Reader); 5] = [
        ("closed", |s| s.filebeat.harvester.closed),
        ("open_files", |s| s.filebeat.harvester.open_files),
        ("running", |s| s.filebeat.harvester.running),
        ("skipped", |s| s.filebeat.harvester.skipped),
        ("started", |s| s.filebeat.harvester.started),
    ];
    let input_log: [(&str, Reader); 2] = [
        ("renamed", |s| s.filebeat.input.log.files.renamed),
        ("truncated", |s| s.filebeat.input.log.files.truncated),
    ];

    let mut catalog = group(namespace, "events", "event", &events);
    catalog.extend(group(namespace, "harvester", "harvester", &harvester));
    catalog.extend(group(namespace, "input_log", "files", &input_log));
    catalog
}

pub(super) fn file_descriptor(namespace: &str, field: FileField, path: &str) -> Descriptor {
    let help = format!("filebeat.harvester.file.{}", field_help(field));
    Descriptor::new(
        namespace,
        FILE_SUBSYSTEM,
        field.metric_name(),
        &help,
        field.kind(),
        &[("path", path)],
    )
}

fn field_help(field: FileField) -> &'static str {
    match field {
        FileField::Size => "size",
        other => other.metric_name(),
    }
}

/// One block of five descriptors per distinct file name. The first key seen
/// for a name wins; later keys with the same name are skipped.
pub(super) fn file_catalog<'a>(namespace: &str, stats: &'a Stats) -> Vec<MetricEntry<'a>> {
    let mut seen = HashSet::new();
    let mut catalog = Vec::new();

    for record in stats.filebeat.harvester.files.values() {
        if !seen.insert(record.name.as_str()) {
            continue;
        }
        catalog.extend(FileField::ALL.into_iter().map(|field| MetricEntry {
            desc: file_descriptor(namespace, field, &record.name),
            eval: Evaluator::File { record, field },
        }));
    }

    catalog
}

/// Registry bookkeeping of the filebeat registrar.
pub(super) fn registrar_catalog(namespace: &str) -> Vec<MetricEntry<'static>> {
    let states: [(&str, Reader); 3] = [
        ("cleanup", |s| s.registrar.states.cleanup),
        ("current", |s| s.registrar.states.current),
        ("update", |s| s.registrar.states.update),
    ];
    let writes: [(&str, Reader); 3] = [
        ("fail", |s| s.registrar.writes.fail),
        ("success", |s| s.registrar.writes.success),
        ("total", |s| s.registrar.writes.total),
    ];

    let mut catalog = labeled(
        namespace,
        "registrar",
        "states",
        "registrar.states",
        MetricKind::Untyped,
        "state",
        &states,
    );
    catalog.extend(labeled(
        namespace,
        "registrar",
        "writes",
        "registrar.writes",
        MetricKind::Untyped,
        "writes",
        &writes,
    ));
    catalog
}
