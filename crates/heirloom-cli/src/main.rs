use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use heirloom_layout::{
    ExpansionState, GraphNode, LayoutEngine, LayoutOptions, NodeKey, Point, RadialConfig,
    SimulationConfig, build_hierarchy, derive_edges, filter_visible, grid_fallback, primary_key,
    reconcile_positions,
};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Layout(heirloom_layout::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<heirloom_layout::Error> for CliError {
    fn from(value: heirloom_layout::Error) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Visible,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    visible_only: bool,
    grid: bool,
    center_x: f64,
    center_y: f64,
    seed: Option<u64>,
    expand: Vec<String>,
    out: Option<String>,
}

/// Input dataset: the caller's node list plus the expansion state driving
/// progressive disclosure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Dataset {
    nodes: Vec<GraphNode>,
    expanded: ExpansionState,
}

fn usage() -> &'static str {
    "heirloom-cli\n\
\n\
USAGE:\n\
  heirloom-cli [layout] [--pretty] [--grid] [--visible-only] [--center-x <n>] [--center-y <n>] [--seed <n>] [--expand <key>]... [--out <path>] [<path>|-]\n\
  heirloom-cli visible [--pretty] [--expand <key>]... [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is JSON: {\"nodes\": [...], \"expanded\": [\"personA\", ...]}.\n\
  - layout prints the position map; --visible-only keeps only keys visible under the expansion state.\n\
  - --grid skips the radial/force pipeline and prints the level-grid fallback.\n\
  - Shared (multi-parent) nodes are keyed \"id@parent\" in input and output.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "visible" => args.command = Command::Visible,
            "--pretty" => args.pretty = true,
            "--visible-only" => args.visible_only = true,
            "--grid" => args.grid = true,
            "--center-x" => {
                let Some(x) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.center_x = x.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !args.center_x.is_finite() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--center-y" => {
                let Some(y) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.center_y = y.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !args.center_y.is_finite() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--seed" => {
                let Some(seed) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.seed = Some(seed.parse::<u64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--expand" => {
                let Some(key) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.expand.push(key.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    match out {
        None => {
            println!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn pins_of(nodes: &[GraphNode]) -> BTreeMap<NodeKey, Point> {
    nodes
        .iter()
        .filter_map(|n| n.pinned.map(|pin| (primary_key(n), pin.to_point())))
        .collect()
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let dataset: Dataset = serde_json::from_str(&text)?;

    let mut expansion = dataset.expanded;
    for key in &args.expand {
        expansion.expand(NodeKey::from(key.as_str()));
    }

    match args.command {
        Command::Layout => {
            let options = LayoutOptions {
                radial: RadialConfig {
                    center_x: args.center_x,
                    center_y: args.center_y,
                    ..Default::default()
                },
                simulation: match args.seed {
                    Some(random_seed) => SimulationConfig {
                        random_seed,
                        ..Default::default()
                    },
                    None => SimulationConfig::default(),
                },
            };

            let mut result = if args.grid {
                let pins = pins_of(&dataset.nodes);
                reconcile_positions(grid_fallback(&dataset.nodes, &options.radial), &pins)
            } else {
                let mut engine = LayoutEngine::new(options);
                engine.compute(&dataset.nodes)?
            };

            if args.visible_only {
                let edges = derive_edges(&dataset.nodes);
                if let Ok(hierarchy) = build_hierarchy(&dataset.nodes, &edges) {
                    let visible = filter_visible(&hierarchy, &expansion);
                    result.positions.retain(|key, _| visible.contains(key));
                }
            }
            write_json(&result, args.pretty, args.out.as_deref())
        }
        Command::Visible => {
            if dataset.nodes.is_empty() {
                return write_json(&BTreeSet::<NodeKey>::new(), args.pretty, args.out.as_deref());
            }
            let edges = derive_edges(&dataset.nodes);
            let hierarchy = build_hierarchy(&dataset.nodes, &edges)?;
            let visible = filter_visible(&hierarchy, &expansion);
            write_json(&visible, args.pretty, args.out.as_deref())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
