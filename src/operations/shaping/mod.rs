mod make_slab;

pub use make_slab::{MakeSlab, SlabParams};
