pub mod builders;
pub mod doubles;
pub mod strategies;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use doubles::*;
