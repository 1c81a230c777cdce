//! Game-stream decoding: tokenizer, token tree, display tags and the
//! classifier that turns tokens into [`StreamCommand`]s.

pub mod classifier;
pub mod tag;
pub mod token;
pub mod tokenizer;

pub use classifier::{Classifier, ClassifierState, StreamCommand};
pub use tag::TextTag;
pub use token::Token;
