/// `LogLens` - An interactive log-inspection engine
///
/// Copyright (C) 2025 LogLens contributors
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use loglens::anomaly::{build_baseline, build_template_groups, detect, Baseline};
use loglens::core::filter::{self, FilterKind, FilterRule};
use loglens::core::search::{find_matches, SearchQuery};
use loglens::core::store::merge_sources;
use loglens::parser::{detect_format, recognizer_by_name, LogRecord, Recognize, Severity};
use loglens::tail::{read_file, read_lines, TailMessage, Tailer};

#[derive(Parser, Debug)]
#[command(name = "loglens")]
#[command(version)]
#[command(about = "Inspect log files with filtering, search and baseline anomaly detection", long_about = None)]
struct Args {
    /// Log files to inspect; stdin when omitted. Multiple files are
    /// merged into one timeline by timestamp.
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Force a specific format (auto, docker, kubernetes, journal,
    /// python, apache, syslog, logfmt, iso) instead of detection
    #[arg(long, value_name = "NAME")]
    format: Option<String>,

    /// Keep only lines containing this substring (repeatable, ORed)
    #[arg(long = "filter", value_name = "SUBSTR")]
    filters: Vec<String>,

    /// Drop lines containing this substring (repeatable, ORed)
    #[arg(long = "exclude", value_name = "SUBSTR")]
    excludes: Vec<String>,

    /// Print only lines matching this search pattern
    #[arg(long, value_name = "PATTERN")]
    search: Option<String>,

    /// Treat the search pattern as a regex
    #[arg(long)]
    regex: bool,

    /// Minimum severity (trace, debug, info, warn, error, fatal)
    #[arg(long = "min-level", value_name = "LEVEL")]
    min_level: Option<String>,

    /// Baseline log file for anomaly detection
    #[arg(long, value_name = "FILE")]
    baseline: Option<PathBuf>,

    /// Keep following the (single) given file for new lines
    #[arg(long)]
    follow: bool,

    /// Print the template group summary instead of log lines
    #[arg(long)]
    templates: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG to override (e.g. RUST_LOG=debug)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    log::info!(
        "LogLens {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let args = Args::parse();
    let rules = build_rules(&args);
    let min_severity = args
        .min_level
        .as_deref()
        .map(|label| {
            Severity::from_label(label)
                .with_context(|| format!("unknown severity level '{label}'"))
        })
        .transpose()?;
    let baseline = args
        .baseline
        .as_deref()
        .map(|path| -> anyhow::Result<Baseline> {
            let records = load_file(path, args.format.as_deref())?;
            log::info!("baseline: {} records from {}", records.len(), path.display());
            Ok(build_baseline(&records))
        })
        .transpose()?;

    if args.follow {
        return follow(&args, &rules, min_severity);
    }

    let records = load_all(&args)?;
    log::info!("loaded {} records", records.len());

    if args.templates {
        print_templates(&records);
        return Ok(());
    }

    let visible = filter::evaluate(&records, &rules);
    let scores = baseline.as_ref().map(|b| detect(&records, b).scores);
    let search = search_query(&args);
    let matching: Option<ahash::AHashSet<usize>> = search.as_ref().map(|query| {
        find_matches(&records, query)
            .into_iter()
            .map(|(record_index, _, _)| record_index)
            .collect()
    });

    for index in visible {
        let record = &records[index];
        if !passes_severity(record, min_severity) {
            continue;
        }
        if let Some(matching) = &matching {
            if !matching.contains(&index) {
                continue;
            }
        }
        print_record(record, scores.as_ref().and_then(|s| s.get(&index)).copied());
    }
    Ok(())
}

fn build_rules(args: &Args) -> Vec<FilterRule> {
    let mut rules = Vec::new();
    for pattern in &args.filters {
        rules.push(FilterRule::substring(FilterKind::Include, pattern.clone()));
    }
    for pattern in &args.excludes {
        rules.push(FilterRule::substring(FilterKind::Exclude, pattern.clone()));
    }
    rules
}

fn search_query(args: &Args) -> Option<SearchQuery> {
    let text = args.search.clone()?;
    Some(if args.regex {
        SearchQuery::regex(text)
    } else {
        SearchQuery::literal(text)
    })
}

fn passes_severity(record: &LogRecord, min: Option<Severity>) -> bool {
    match min {
        None => true,
        Some(min) => record.severity.is_some_and(|sev| sev >= min),
    }
}

fn make_recognizer(format: Option<&str>, sample: &[String]) -> anyhow::Result<Box<dyn Recognize>> {
    match format {
        Some(name) => {
            recognizer_by_name(name).with_context(|| format!("unknown format '{name}'"))
        }
        None => Ok(detect_format(sample.iter().map(String::as_str))),
    }
}

fn load_file(path: &Path, format: Option<&str>) -> anyhow::Result<Vec<LogRecord>> {
    let sample = sample_lines(path)?;
    let recognizer = make_recognizer(format, &sample)?;
    read_file(path, recognizer.as_ref())
}

fn sample_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    use std::io::BufRead;
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .take(64)
        .collect())
}

fn load_all(args: &Args) -> anyhow::Result<Vec<LogRecord>> {
    if args.files.is_empty() {
        let stdin = std::io::stdin();
        let recognizer: Box<dyn Recognize> = match args.format.as_deref() {
            Some(name) => {
                recognizer_by_name(name).with_context(|| format!("unknown format '{name}'"))?
            }
            None => Box::new(loglens::parser::Auto::new()),
        };
        return Ok(read_lines(stdin.lock(), recognizer.as_ref()));
    }
    if args.files.len() == 1 {
        return load_file(&args.files[0], args.format.as_deref());
    }
    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let records = load_file(path, args.format.as_deref())?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        sources.push((name, records));
    }
    Ok(merge_sources(sources))
}

fn follow(args: &Args, rules: &[FilterRule], min_severity: Option<Severity>) -> anyhow::Result<()> {
    let [path] = args.files.as_slice() else {
        bail!("--follow needs exactly one file");
    };
    let sample = sample_lines(path).unwrap_or_default();
    let recognizer = make_recognizer(args.format.as_deref(), &sample)?;
    let (tailer, rx) = Tailer::spawn(path.clone(), recognizer, Duration::from_millis(200));

    for message in rx {
        match message {
            TailMessage::Records(records) => {
                for record in records {
                    if filter::check(&record, rules) && passes_severity(&record, min_severity) {
                        print_record(&record, None);
                    }
                }
            }
            TailMessage::Truncated => {
                log::warn!("{} was truncated, following from the top", path.display());
            }
        }
    }
    drop(tailer);
    Ok(())
}

fn print_record(record: &LogRecord, score: Option<f64>) {
    let badge = record.severity.map_or(' ', Severity::badge);
    match score {
        Some(score) if score > 0.0 => {
            println!("{:>6} {badge} [{score:.1}] {}", record.line_number, record.raw);
        }
        _ => println!("{:>6} {badge} {}", record.line_number, record.raw),
    }
}

fn print_templates(records: &[LogRecord]) {
    let groups = build_template_groups(records);
    log::info!("{} template groups", groups.len());
    for group in groups {
        let badge = group.severity.map_or(' ', Severity::badge);
        println!("{:>6}x {badge} {}", group.count, group.template);
    }
}
