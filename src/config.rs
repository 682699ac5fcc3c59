use std::path::PathBuf;

use thiserror::Error;

use crate::problem::ProblemDescription;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("option '{0}' needs a value")]
    MissingValue(String),
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("only one problem file may be given, got '{0}' and '{1}'")]
    TooManyProblems(String, String),
}

/// Where a run reads meshes from and writes its results to.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Relative mesh paths of problem descriptions resolve against this directory.
    pub data_dir: PathBuf,
    /// Overrides the problem's own `output_dir` option.
    pub output_dir: Option<PathBuf>,
    /// Problem description to load; the built-in temperature problem when unset.
    pub problem: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: None,
            problem: None,
        }
    }
}

impl RunConfig {
    /// Parse `[PROBLEM.json] [--data-dir DIR] [--output-dir DIR]`, without the
    /// program name.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter().map(Into::<String>::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" | "--output-dir" => {
                    let value = args
                        .next()
                        .map(PathBuf::from)
                        .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    if arg == "--data-dir" {
                        config.data_dir = value;
                    } else {
                        config.output_dir = Some(value);
                    }
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownOption(flag.to_string()));
                }
                path => {
                    if let Some(first) = &config.problem {
                        return Err(ConfigError::TooManyProblems(
                            first.display().to_string(),
                            path.to_string(),
                        ));
                    }
                    config.problem = Some(PathBuf::from(path));
                }
            }
        }
        Ok(config)
    }

    /// Output directory: the command line wins over the problem's option,
    /// `output` is the fallback.
    pub fn output_dir_for(&self, problem: &ProblemDescription) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| problem.options().output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("output"))
    }
}
