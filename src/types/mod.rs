mod core;
mod directives;

pub use self::core::{ConvertType, EngineInfo, RenderOutput, Viewport};
pub use directives::GlobalDirectives;
