mod mutation;
mod navigation;
mod outline;
mod range;

pub use outline::format_tree;
