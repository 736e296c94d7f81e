//! Functions for loading video settings.

use serde::{Deserialize, Serialize};

use super::errors::*;

/// A structure containing configuration data for the video system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    /// Sets the name of the thread that owns the GPU context.
    pub thread_name: String,
    /// Sets whether textures created from picture data use linear filtering.
    pub smooth: bool,
    /// Specifies whether the software backend should warn when it is asked to
    /// run a custom fragment shader, which it can not execute.
    pub warn_custom_shaders: bool,
}

impl Default for VideoParams {
    fn default() -> Self {
        VideoParams {
            thread_name: "glcanvas-gpu".to_owned(),
            smooth: false,
            warn_custom_shaders: true,
        }
    }
}

impl VideoParams {
    /// Parses params from JSON, missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let params = serde_json::from_str(json)?;
        Ok(params)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_json() {
        let params = VideoParams::from_json(r#"{ "smooth": true }"#).unwrap();
        assert!(params.smooth);
        assert_eq!(params.thread_name, VideoParams::default().thread_name);

        assert!(VideoParams::from_json("{ smooth }").is_err());
    }
}
