//! Error types for the learngl core.

use crate::gpu::ShaderStage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by GPU resource, camera, loop and config operations.
///
/// Every variant names the resource or path involved and, where the
/// backend produced one, carries its diagnostic text.
#[derive(Debug, Clone, Error)]
pub enum GlError {
    /// The backend refused to create a GPU object.
    #[error("failed to allocate {resource}: {reason}")]
    Allocation { resource: String, reason: String },

    /// A handle was used after `release()` destroyed it.
    #[error("{resource} used after release")]
    UseAfterRelease { resource: String },

    /// A vertex layout already declares the maximum number of attributes.
    #[error("vertex attribute limit of {limit} exceeded")]
    AttributeLimitExceeded { limit: u32 },

    /// An image could not be decoded or uploaded.
    #[error("failed to load texture '{}': {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },

    /// A shader stage failed to compile.
    #[error("{stage} shader '{label}' failed to compile:\n{log}")]
    Compile {
        stage: ShaderStage,
        label: String,
        log: String,
    },

    /// A program failed to link.
    #[error("program '{label}' failed to link:\n{log}")]
    Link { label: String, log: String },

    /// A program was used before a successful link.
    #[error("program '{label}' is not linked")]
    NotLinked { label: String },

    /// An argument was outside its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The window or GL context could not be created.
    #[error("failed to initialise graphics context: {0}")]
    ContextInit(String),

    /// A model file could not be parsed.
    #[error("failed to load model '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// A file could not be read or written.
    #[error("I/O error on '{}': {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GlError {
    pub(crate) fn allocation(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        GlError::Allocation {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn use_after_release(resource: impl Into<String>) -> Self {
        GlError::UseAfterRelease {
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_names_resource_and_reason() {
        let err = GlError::allocation("vertex buffer 'quad'", "out of memory");
        let msg = format!("{err}");
        assert!(msg.contains("quad"), "missing resource in: {msg}");
        assert!(msg.contains("out of memory"), "missing reason in: {msg}");
    }

    #[test]
    fn use_after_release_names_resource() {
        let err = GlError::use_after_release("texture 'container.png'");
        let msg = format!("{err}");
        assert!(msg.contains("container.png"), "missing resource in: {msg}");
        assert!(msg.contains("after release"), "got: {msg}");
    }

    #[test]
    fn attribute_limit_includes_limit() {
        let msg = format!("{}", GlError::AttributeLimitExceeded { limit: 16 });
        assert!(msg.contains("16"), "missing limit in: {msg}");
    }

    #[test]
    fn texture_load_includes_path_and_reason() {
        let err = GlError::TextureLoad {
            path: PathBuf::from("assets/wall.jpg"),
            reason: "No such file".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("assets/wall.jpg"), "missing path in: {msg}");
        assert!(msg.contains("No such file"), "missing reason in: {msg}");
    }

    #[test]
    fn compile_includes_stage_label_and_log() {
        let err = GlError::Compile {
            stage: ShaderStage::Fragment,
            label: "lighting".into(),
            log: "0:12: undeclared identifier".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("fragment"), "missing stage in: {msg}");
        assert!(msg.contains("lighting"), "missing label in: {msg}");
        assert!(msg.contains("undeclared identifier"), "missing log in: {msg}");
    }

    #[test]
    fn link_and_not_linked_include_label() {
        let link = format!(
            "{}",
            GlError::Link {
                label: "outline".into(),
                log: "varying mismatch".into()
            }
        );
        assert!(link.contains("outline") && link.contains("varying mismatch"), "got: {link}");

        let not_linked = format!("{}", GlError::NotLinked { label: "outline".into() });
        assert!(not_linked.contains("outline"), "got: {not_linked}");
    }

    #[test]
    fn model_load_and_io_include_path() {
        let model = GlError::ModelLoad {
            path: PathBuf::from("backpack.gltf"),
            reason: "invalid JSON".into(),
        };
        assert!(format!("{model}").contains("backpack.gltf"));
        let io = GlError::Io {
            path: PathBuf::from("shader.vs"),
            reason: "permission denied".into(),
        };
        assert!(format!("{io}").contains("shader.vs"));
    }

    #[test]
    fn gl_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GlError>();
    }

    #[test]
    fn gl_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<GlError>();
    }
}
