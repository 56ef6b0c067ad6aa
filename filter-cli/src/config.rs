use anyhow::{Context, Result, bail};
use derivative::Derivative;
use image_filter::{FilterCatalog, FilterPipeline, OutputFormat};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_FILE: &str = "filter.toml";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub is_first_run: bool,

    #[serde(default)]
    pub output: Output,

    #[serde(default)]
    pub filters: Filters,

    #[serde(default)]
    pub decode: Decode,

    #[serde(default)]
    pub store: Store,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Output {
    #[derivative(Default(value = "\"jpeg\".to_string()"))]
    pub format: String,

    #[derivative(Default(value = "90"))]
    pub jpeg_quality: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Filters {
    #[derivative(Default(value = "35"))]
    pub blur_size: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Decode {
    pub expand_gray: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Store {
    #[derivative(Default(value = "\"filter-data\".to_string()"))]
    pub root: String,
}

impl Config {
    /// Read `path`, or write the defaults there when it is missing or
    /// unreadable. A broken file is kept as `<path>.bak`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<Config>(&text) {
                Ok(mut config) => {
                    config.config_path = path;
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("parse {} failed, using defaults: {e}", path.display());
                    _ = fs::copy(&path, format!("{}.bak", path.display()));
                    Self::first_run(path)
                }
            },
            Err(_) => Self::first_run(path),
        }
    }

    fn first_run(path: PathBuf) -> Result<Self> {
        let config = Config {
            config_path: path,
            is_first_run: true,
            ..Default::default()
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        match toml::to_string_pretty(self) {
            Ok(text) => Ok(fs::write(&self.config_path, text)
                .with_context(|| format!("save config {} failed", self.config_path.display()))?),
            Err(e) => bail!(format!("convert config to toml format failed. {e:?}")),
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match OutputFormat::from_extension(&self.output.format) {
            Some(format) => Ok(format),
            None => bail!("unsupported output format `{}`", self.output.format),
        }
    }

    pub fn pipeline(&self) -> Result<FilterPipeline> {
        Ok(FilterPipeline::new()
            .with_output_format(self.output_format()?)
            .with_jpeg_quality(self.output.jpeg_quality)
            .with_expand_gray(self.decode.expand_gray))
    }

    pub fn catalog(&self) -> Result<FilterCatalog> {
        FilterCatalog::with_blur_size(self.filters.blur_size)
            .with_context(|| format!("invalid [filters] blur_size {}", self.filters.blur_size))
    }
}
