pub mod audio;
pub mod disp;
pub mod input;
pub mod interp;
pub mod prog;
