pub(crate) trait Service<Request> {
    type Response;
    type Error;

    fn call(&self, request: Request) -> Result<Self::Response, Self::Error>;
}

impl<S: Service<Request> + ?Sized, Request> Service<Request> for &S {
    type Response = S::Response;
    type Error = S::Error;

    #[inline]
    fn call(&self, request: Request) -> Result<Self::Response, Self::Error> {
        (**self).call(request)
    }
}
