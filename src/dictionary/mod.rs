//! Feature naming trees shared between vectors of the same shape

mod string_dictionary;
mod feature_dictionary;

pub use string_dictionary::StringDictionary;
pub use feature_dictionary::{
    FeatureDictionary, DictionaryRef, same_dictionary, check_same_dictionary,
};
