use std::any::TypeId;
use std::fmt;

/// Identifies a declared application type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppKey {
    id: TypeId,
    type_name: &'static str,
}

impl AppKey {
    pub fn of<A: 'static>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppKey({})", self.type_name)
    }
}

impl fmt::Display for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Well-known metadata slots per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    Routes,
    SocketRoutes,
    NativeSocketRoutes,
    GraphqlRoutes,
    Name,
    Port,
    Configuration,
    AppMiddleware,
    PublicDirectory,
    PerRouteMiddleware,
}

impl MetadataKey {
    /// The list-valued keys every application gets an empty default for.
    pub const ROUTE_KINDS: [MetadataKey; 4] = [
        MetadataKey::NativeSocketRoutes,
        MetadataKey::SocketRoutes,
        MetadataKey::Routes,
        MetadataKey::GraphqlRoutes,
    ];
}
