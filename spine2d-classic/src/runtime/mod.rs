mod animation;
mod animation_state;
mod constraint;
mod skeleton;
mod timeline;

pub use animation::*;
pub use animation_state::*;
pub use constraint::*;
pub use skeleton::*;
pub use timeline::*;

#[cfg(test)]
pub(crate) mod test_rigs;


#[cfg(test)]
mod timeline_tests;


#[cfg(test)]
mod animation_state_tests;


#[cfg(test)]
mod transform_constraint_tests;
