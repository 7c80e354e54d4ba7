//! The backend of the compiler deals with LIR (Low-level Intermediate
//! Representation).
//!
//! To lower the analysed AST to LIR, two steps are required:
//! 1. Allocate room for variables, parameters and outgoing arguments in the
//!    frame of each function, removing names.
//! 2. Walk function bodies, simplifying control structures to labels and
//!    jumps and names to memory accesses.

pub mod layout;
pub mod lir;
