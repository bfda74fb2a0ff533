//! Argument parsing and command execution.

use archview_core::{
    FormatConfig, LintSeverity, Registry, Resolver, ViewStore, fill_view_placeholders,
    format_document, lint_registry, parse_document,
};
use serde_json::{Value, json};
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Parse {
        file: String,
    },
    Fmt {
        file: String,
        indent: usize,
    },
    Resolve {
        name: String,
        registry: String,
        arch: Option<String>,
        fill: bool,
    },
    Lint {
        registry: String,
        json: bool,
    },
}

impl Command {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let (sub, rest) = args.split_first().ok_or("missing command")?;
        let mut positional = Vec::new();
        let mut registry = None;
        let mut arch = None;
        let mut indent = FormatConfig::default().indent_width;
        let mut fill = false;
        let mut json = false;

        let mut iter = rest.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--registry" => registry = Some(value_of("--registry", iter.next())?),
                "--arch" => arch = Some(value_of("--arch", iter.next())?),
                "--indent" => {
                    let raw = value_of("--indent", iter.next())?;
                    indent = raw
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("--indent expects a positive number, got '{raw}'"))?;
                }
                "--fill" => fill = true,
                "--json" => json = true,
                flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
                _ => positional.push(arg.clone()),
            }
        }

        let single = |what: &str| -> Result<String, String> {
            match positional.as_slice() {
                [one] => Ok(one.clone()),
                [] => Err(format!("{sub}: missing {what}")),
                _ => Err(format!("{sub}: expected exactly one {what}")),
            }
        };
        let required = |flag: &str, value: Option<String>| {
            value.ok_or_else(|| format!("{sub}: {flag} FILE is required"))
        };

        match sub.as_str() {
            "parse" => Ok(Command::Parse { file: single("FILE")? }),
            "fmt" => Ok(Command::Fmt {
                file: single("FILE")?,
                indent,
            }),
            "resolve" => Ok(Command::Resolve {
                name: single("NAME")?,
                registry: required("--registry", registry)?,
                arch,
                fill,
            }),
            "lint" => Ok(Command::Lint {
                registry: required("--registry", registry)?,
                json,
            }),
            other => Err(format!("unknown command '{other}'")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Parse { .. } => "parse",
            Command::Fmt { .. } => "fmt",
            Command::Resolve { .. } => "resolve",
            Command::Lint { .. } => "lint",
        }
    }
}

fn value_of(flag: &str, value: Option<&String>) -> Result<String, String> {
    value
        .cloned()
        .ok_or_else(|| format!("{flag} expects a value"))
}

/// Read `path`, or stdin when `path` is `-`.
fn read_source(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("failed to read '{path}': {e}"))
}

fn load_registry(path: &str, arch: Option<&str>) -> Result<Registry, String> {
    let mut registry = Registry::from_json(&read_source(path)?).map_err(|e| e.to_string())?;
    if let Some(arch) = arch {
        let parsed = parse_document(&read_source(arch)?).map_err(|e| format!("{arch}: {e}"))?;
        registry.merge_architectures(parsed);
    }
    Ok(registry)
}

fn to_pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| e.to_string())
}

/// Execute `command`, returning what should be printed on stdout.
pub fn run(command: &Command) -> Result<String, String> {
    match command {
        Command::Parse { file } => {
            let archs = parse_document(&read_source(file)?).map_err(|e| e.to_string())?;
            let value: serde_json::Map<String, Value> = archs
                .into_iter()
                .map(|(name, arch)| (name, Value::from(arch)))
                .collect();
            to_pretty(&Value::Object(value))
        }
        Command::Fmt { file, indent } => {
            let config = FormatConfig {
                indent_width: *indent,
            };
            format_document(&read_source(file)?, &config).map_err(|e| e.to_string())
        }
        Command::Resolve {
            name,
            registry,
            arch,
            fill,
        } => {
            let registry = load_registry(registry, arch.as_deref())?;
            let mut store = ViewStore::new();
            let mut view = Resolver::new(&registry, &mut store)
                .open(name)
                .cloned()
                .ok_or_else(|| format!("no architecture or detail named '{name}'"))?;
            if *fill {
                fill_view_placeholders(&mut view);
            }
            let output = json!({
                "view": view,
                "navigation": store.navigation(),
            });
            to_pretty(&output)
        }
        Command::Lint { registry, json } => {
            let registry = load_registry(registry, None)?;
            let diags = lint_registry(&registry);
            if *json {
                let items: Vec<Value> = diags
                    .iter()
                    .map(|d| {
                        json!({
                            "subject": d.subject,
                            "rule": d.rule,
                            "severity": severity_label(d.severity),
                            "message": d.message,
                        })
                    })
                    .collect();
                return to_pretty(&Value::Array(items));
            }
            let mut out = String::new();
            for d in &diags {
                out.push_str(&format!(
                    "{}[{}] {}: {}\n",
                    severity_label(d.severity),
                    d.rule,
                    d.subject,
                    d.message
                ));
            }
            if diags.is_empty() {
                log::info!("no lint findings");
            }
            Ok(out)
        }
    }
}

fn severity_label(severity: LintSeverity) -> &'static str {
    match severity {
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_subcommands() {
        assert_eq!(
            Command::from_args(&args(&["fmt", "a.arch", "--indent", "2"])).unwrap(),
            Command::Fmt {
                file: "a.arch".into(),
                indent: 2
            }
        );
        assert_eq!(
            Command::from_args(&args(&[
                "resolve", "llama", "--registry", "r.json", "--arch", "a.arch", "--fill"
            ]))
            .unwrap(),
            Command::Resolve {
                name: "llama".into(),
                registry: "r.json".into(),
                arch: Some("a.arch".into()),
                fill: true,
            }
        );
        assert_eq!(
            Command::from_args(&args(&["lint", "--registry", "r.json", "--json"])).unwrap(),
            Command::Lint {
                registry: "r.json".into(),
                json: true
            }
        );
    }

    #[test]
    fn reject_bad_arguments() {
        assert!(Command::from_args(&[]).is_err());
        assert!(Command::from_args(&args(&["explode"])).is_err());
        assert!(Command::from_args(&args(&["parse"])).is_err());
        assert!(Command::from_args(&args(&["parse", "a", "b"])).is_err());
        assert!(Command::from_args(&args(&["resolve", "llama"])).is_err());
        assert!(Command::from_args(&args(&["fmt", "a", "--indent", "0"])).is_err());
        assert!(Command::from_args(&args(&["fmt", "a", "--indent"])).is_err());
        assert!(Command::from_args(&args(&["fmt", "a", "--wat"])).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = run(&Command::Parse {
            file: "/nonexistent/definitely/missing.arch".into(),
        })
        .unwrap_err();
        assert!(err.contains("missing.arch"));
    }
}
