mod cache_layer;

pub use cache_layer::CachedExchanger;
