//! Interactive commands

use anyhow::{anyhow, bail, Result};
use sd_core::Dimension;
use sd_views::PanelKind;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  set <sector|region|service> <value|all>   change a filter
  range <panel> <preset>                    e.g. range monthly 6m, range daily 90d
  options [dimension]                       list filter options
  show                                      print the dashboard
  wait                                      wait for loading to finish, then print
  save                                      save the current filters as preferences
  help                                      show this help
  quit                                      exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(Dimension, Option<String>),
    Range(PanelKind, String),
    Options(Option<Dimension>),
    Show,
    Wait,
    Save,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().map(str::to_ascii_lowercase).unwrap_or_default();
        let rest: Vec<&str> = words.collect();

        let parsed = match (command.as_str(), rest.as_slice()) {
            ("set", [dimension, value @ ..]) => {
                let dimension: Dimension = dimension.parse()?;
                let value = value.join(" ");
                let value = if value.is_empty() || value.eq_ignore_ascii_case("all") {
                    None
                } else {
                    Some(value)
                };
                Command::Set(dimension, value)
            }
            ("range", [panel, preset]) => {
                let panel: PanelKind = panel
                    .parse()
                    .map_err(|name| anyhow!("unknown panel '{}'", name))?;
                Command::Range(panel, preset.to_string())
            }
            ("options", []) => Command::Options(None),
            ("options", [dimension]) => Command::Options(Some(dimension.parse()?)),
            ("show", []) | ("", []) => Command::Show,
            ("wait", []) => Command::Wait,
            ("save", []) => Command::Save,
            ("help", _) | ("?", _) => Command::Help,
            ("quit", []) | ("exit", []) => Command::Quit,
            _ => bail!("could not understand '{}', type 'help'", line.trim()),
        };
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set() {
        assert_eq!(
            "set sector office".parse::<Command>().unwrap(),
            Command::Set(Dimension::Sector, Some("office".into()))
        );
        assert_eq!(
            "set Regions all".parse::<Command>().unwrap(),
            Command::Set(Dimension::Region, None)
        );
        assert_eq!("set service".parse::<Command>().unwrap(), Command::Set(Dimension::Service, None));
        assert!("set colour red".parse::<Command>().is_err());
    }

    #[test]
    fn test_range() {
        assert_eq!(
            "range daily-forecast 14d".parse::<Command>().unwrap(),
            Command::Range(PanelKind::DailyForecast, "14d".into())
        );
        assert!("range pie 3m".parse::<Command>().is_err());
        assert!("range monthly".parse::<Command>().is_err());
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!("".parse::<Command>().unwrap(), Command::Show);
        assert_eq!("  WAIT ".parse::<Command>().unwrap(), Command::Wait);
        assert_eq!("options region".parse::<Command>().unwrap(), Command::Options(Some(Dimension::Region)));
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
        assert!("dance".parse::<Command>().is_err());
    }
}
