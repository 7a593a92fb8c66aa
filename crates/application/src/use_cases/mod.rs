mod dispatch_query;

pub use dispatch_query::DispatchQueryUseCase;
