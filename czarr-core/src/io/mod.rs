mod npy;
mod table;

pub use npy::write_numpy;

pub use table::write_table;
pub use table::write_table_csv;
pub use table::write_table_pq;
pub use table::write_table_tsv;
