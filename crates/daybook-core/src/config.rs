use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::size::{
  CellHeight,
  SizePolicy,
  Viewport
};
use crate::timeline::TimelineSettings;

const CONFIG_ENV_VAR: &str =
  "DAYBOOK_CONFIG";
const CONFIG_FILE_NAME: &str =
  "daybook.toml";
const APP_DIR_NAME: &str = "daybook";
/// Upper bound for `past_range` and
/// `future_range`, in months (a
/// century either way).
pub const MAX_RANGE: i64 = 1200;

#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default)]
pub struct DaybookConfig {
  pub timeline:    TimelineSection,
  pub size:        SizeSection,
  pub time:        TimeSection,
  pub data:        DataSection,
  pub feedback:    FeedbackSection,
  #[serde(skip)]
  pub loaded_from: Option<PathBuf>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineSection {
  pub past_range:        i64,
  pub future_range:      i64,
  pub debounce_ms:       i64,
  pub visible_threshold: f32
}

impl Default for TimelineSection {
  fn default() -> Self {
    Self {
      past_range:        6,
      future_range:      48,
      debounce_ms:       150,
      visible_threshold: 50.0
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizeSection {
  pub horizontal_padding:    f32,
  pub month_header_height:   f32,
  pub weekday_header_height: f32,
  pub cell_height:           f32,
  /// When set, cells share the
  /// viewport height left after this
  /// many pixels instead of using
  /// `cell_height`.
  pub fill_reserved_height:  Option<f32>,
  pub viewport_width:        f32,
  pub viewport_height:       f32
}

impl Default for SizeSection {
  fn default() -> Self {
    Self {
      horizontal_padding:    32.0,
      month_header_height:   48.0,
      weekday_header_height: 40.0,
      cell_height:           56.0,
      fill_reserved_height:  None,
      viewport_width:        390.0,
      viewport_height:       844.0
    }
  }
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default)]
pub struct TimeSection {
  pub timezone: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default)]
pub struct DataSection {
  pub location: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default)]
pub struct FeedbackSection {
  pub command: Option<String>
}

impl DaybookConfig {
  #[tracing::instrument(skip(
    override_path
  ))]
  pub fn load(
    override_path: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(override_path)
    else {
      warn!(
        "cannot locate a config \
         directory; using defaults"
      );
      return Ok(Self::default());
    };

    if !path.exists() {
      if override_path.is_some() {
        return Err(anyhow!(
          "config file {} does not \
           exist",
          path.display()
        ));
      }
      info!(file = %path.display(), "no config file; using defaults");
      return Ok(Self::default());
    }

    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut config = Self::from_toml_str(
      &raw
    )
    .with_context(|| {
      format!(
        "failed to parse {}",
        path.display()
      )
    })?;
    config.loaded_from = Some(path);

    info!(
      file = ?config.loaded_from,
      past_range = config.timeline.past_range,
      future_range = config.timeline.future_range,
      timezone = ?config.time.timezone,
      "loaded daybook config"
    );
    Ok(config)
  }

  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut config =
      toml::from_str::<Self>(raw)?;
    config.sanitize();
    Ok(config)
  }

  fn sanitize(&mut self) {
    let defaults_timeline =
      TimelineSection::default();
    let defaults_size =
      SizeSection::default();

    sanitize_range(
      &mut self.timeline.past_range,
      defaults_timeline.past_range,
      "past_range"
    );
    sanitize_range(
      &mut self.timeline.future_range,
      defaults_timeline.future_range,
      "future_range"
    );
    if self.timeline.debounce_ms <= 0 {
      warn!(
        value = self.timeline.debounce_ms,
        "non-positive debounce_ms; \
         using default"
      );
      self.timeline.debounce_ms =
        defaults_timeline.debounce_ms;
    }
    if !(0.0..=100.0).contains(
      &self.timeline.visible_threshold
    ) {
      warn!(
        value = self.timeline.visible_threshold,
        "visible_threshold outside \
         0..=100; using default"
      );
      self.timeline.visible_threshold =
        defaults_timeline
          .visible_threshold;
    }

    sanitize_positive(
      &mut self.size.cell_height,
      defaults_size.cell_height,
      "cell_height"
    );
    sanitize_positive(
      &mut self.size.viewport_width,
      defaults_size.viewport_width,
      "viewport_width"
    );
    sanitize_positive(
      &mut self.size.viewport_height,
      defaults_size.viewport_height,
      "viewport_height"
    );
    sanitize_non_negative(
      &mut self.size.horizontal_padding,
      defaults_size.horizontal_padding,
      "horizontal_padding"
    );
    sanitize_non_negative(
      &mut self.size.month_header_height,
      defaults_size.month_header_height,
      "month_header_height"
    );
    sanitize_non_negative(
      &mut self.size.weekday_header_height,
      defaults_size.weekday_header_height,
      "weekday_header_height"
    );
    if let Some(reserved) =
      self.size.fill_reserved_height
      && (!reserved.is_finite()
        || reserved < 0.0)
    {
      self.size.fill_reserved_height =
        None;
    }

    if let Some(command) =
      self.feedback.command.as_ref()
      && command.trim().is_empty()
    {
      self.feedback.command = None;
    }
  }

  pub fn timeline_settings(
    &self
  ) -> TimelineSettings {
    TimelineSettings {
      past_range:        clamp_range(
        self.timeline.past_range
      ),
      future_range:      clamp_range(
        self.timeline.future_range
      ),
      debounce:          Duration::from_millis(
        self.timeline.debounce_ms.max(0)
          as u64
      ),
      visible_threshold: self
        .timeline
        .visible_threshold
    }
  }

  pub fn size_policy(&self) -> SizePolicy {
    let cell_height = match self
      .size
      .fill_reserved_height
    {
      | Some(reserved) => {
        CellHeight::Fill { reserved }
      }
      | None => {
        CellHeight::Fixed(
          self.size.cell_height
        )
      }
    };
    SizePolicy {
      horizontal_padding: self
        .size
        .horizontal_padding,
      month_header_height: self
        .size
        .month_header_height,
      weekday_header_height: self
        .size
        .weekday_header_height,
      cell_height
    }
  }

  pub fn default_viewport(
    &self
  ) -> Viewport {
    Viewport::new(
      self.size.viewport_width,
      self.size.viewport_height
    )
  }
}

fn sanitize_positive(
  value: &mut f32,
  default: f32,
  name: &str
) {
  if !value.is_finite() || *value <= 0.0
  {
    warn!(
      field = name,
      value = *value,
      "non-positive size; using default"
    );
    *value = default;
  }
}

fn sanitize_non_negative(
  value: &mut f32,
  default: f32,
  name: &str
) {
  if !value.is_finite() || *value < 0.0
  {
    warn!(
      field = name,
      value = *value,
      "negative or non-finite size; \
       using default"
    );
    *value = default;
  }
}

fn sanitize_range(
  value: &mut i64,
  default: i64,
  name: &str
) {
  if !(0..=MAX_RANGE).contains(value) {
    warn!(
      field = name,
      value = *value,
      max = MAX_RANGE,
      "timeline range outside \
       0..=max; using default"
    );
    *value = default;
  }
}

fn clamp_range(value: i64) -> u32 {
  u32::try_from(value.clamp(0, MAX_RANGE))
    .unwrap_or(0)
}

#[tracing::instrument(skip(
  override_path
))]
pub fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      debug!(path = %trimmed, "config path from environment");
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  dirs::config_dir().map(|dir| {
    dir
      .join(APP_DIR_NAME)
      .join(CONFIG_FILE_NAME)
  })
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &DaybookConfig,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    expand_tilde(path)
  } else if let Some(location) =
    cfg.data.location.as_deref()
  {
    expand_tilde(Path::new(location))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join(APP_DIR_NAME))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
