use chrono::{SecondsFormat, Utc};
use env_logger::Env;
use log::{kv, Level, Record};
#[cfg(any(test, not(debug_assertions)))]
use serde_json::{Map, Value};
use std::io::Write;

fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::Error => "Error",
        Level::Debug => "Debug",
        Level::Info => "Info",
        Level::Warn => "Warn",
        Level::Trace => "Trace",
    }
}

struct LogParams<'a> {
    severity: &'static str,
    date: String,
    module_path: &'a str,
    file: &'a str,
    line: u32,
}

fn log_params<'a>(record: &'a Record) -> LogParams<'a> {
    LogParams {
        severity: level_to_str(record.level()),
        date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        module_path: record.module_path().unwrap_or_default(),
        file: record.file().unwrap_or_default(),
        line: record.line().unwrap_or_default(),
    }
}

/// Collects the record's key/value pairs. Values that are valid JSON are kept as JSON.
#[cfg(any(test, not(debug_assertions)))]
struct JsonFields<'a> {
    fields: &'a mut Map<String, Value>,
}

#[cfg(any(test, not(debug_assertions)))]
impl<'kvs, 'a> kv::VisitSource<'kvs> for JsonFields<'a> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, val: kv::Value<'kvs>) -> Result<(), kv::Error> {
        let raw = val.to_string();
        let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
        self.fields.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(debug_assertions)]
struct PlainFields<'a, W: Write> {
    writer: &'a mut W,
}

#[cfg(debug_assertions)]
impl<'kvs, 'a, W: Write> kv::VisitSource<'kvs> for PlainFields<'a, W> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, val: kv::Value<'kvs>) -> Result<(), kv::Error> {
        write!(self.writer, "\n  {}={}", key, val).map_err(|_| kv::Error::msg("failed to write key/value pair"))
    }
}

#[cfg(debug_assertions)]
fn write_debug(f: &mut env_logger::fmt::Formatter, record: &Record, beat: &str) -> std::io::Result<()> {
    use env_logger::fmt::Color;

    let params = log_params(record);

    let mut level_style = f.default_level_style(record.level());
    level_style.set_bold(true);

    let mut general_style = f.style();
    general_style.set_color(Color::Rgb(110, 110, 110));

    let mut module_style = f.style();
    module_style.set_color(Color::Cyan);

    write!(
        f,
        "{}  {:5}  [{}] {} ({}:{})  {}",
        general_style.value(params.date),
        level_style.value(params.severity),
        beat,
        module_style.value(params.module_path),
        general_style.value(params.file),
        general_style.value(params.line),
        record.args()
    )?;
    let _ = record.key_values().visit(&mut PlainFields { writer: &mut *f });
    writeln!(f)
}

/// One JSON object per line: `date`, `severity`, `beat`, `message`, `className`, `file`, `line` plus any key/value pairs.
#[cfg(any(test, not(debug_assertions)))]
fn write_json<F: Write>(f: &mut F, record: &Record, beat: &str) -> std::io::Result<()> {
    let params = log_params(record);

    let mut fields = Map::new();
    fields.insert("date".to_owned(), Value::String(params.date));
    fields.insert("severity".to_owned(), Value::String(params.severity.to_owned()));
    fields.insert("beat".to_owned(), Value::String(beat.to_owned()));
    fields.insert("message".to_owned(), Value::String(record.args().to_string()));
    fields.insert("className".to_owned(), Value::String(params.module_path.to_owned()));
    fields.insert("file".to_owned(), Value::String(params.file.to_owned()));
    fields.insert("line".to_owned(), Value::from(params.line));
    let _ = record.key_values().visit(&mut JsonFields { fields: &mut fields });

    serde_json::to_writer(&mut *f, &Value::Object(fields))?;
    writeln!(f)
}

fn builder() -> env_logger::Builder {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
}

/// Installs the global logger for `beat`, coloured lines in debug builds. Defaults to `info` unless `RUST_LOG`
/// says otherwise. Calling it twice is harmless.
#[cfg(debug_assertions)]
pub fn init(beat: &str) {
    let beat = beat.to_owned();
    let _ = builder().format(move |f, record| write_debug(f, record, &beat)).try_init();
}

/// Installs the global logger for `beat`, JSON lines in release builds.
#[cfg(not(debug_assertions))]
pub fn init(beat: &str) {
    let beat = beat.to_owned();
    let _ = builder().format(move |f, record| write_json(f, record, &beat)).try_init();
}
