//! Test modules relocated from implementation files, plus end-to-end
//! program tests.

mod operators_tests;
mod programs_tests;
mod unary_operators_tests;
