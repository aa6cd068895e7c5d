// Domain layer: typed rows, the exclusion list codec and the ports the
// pipeline talks through.

pub mod exclusion_list;
pub mod model;
pub mod ports;
