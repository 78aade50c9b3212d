pub mod character;
pub mod history;
pub mod key;
pub mod mark;
pub mod node;
pub mod selection;

pub use character::{Character, characters_to_string};
pub use history::{Batch, History};
pub use key::Key;
pub use mark::{Mark, MarkSet, marks};
pub use node::{Container, Kind, Node, Path, Properties, Text};
pub use selection::Selection;
