pub mod editor;
pub mod parser;

pub use editor::{ApplyReport, PomEditor};
pub use parser::{DeclarationKind, ParentRef, PomDeclaration, PomFile, TextSpan};
