mod base;
mod boxed;
mod service_fn;

pub(crate) use base::Service;
pub(crate) use boxed::BoxedService;
pub(crate) use service_fn::service_fn;
