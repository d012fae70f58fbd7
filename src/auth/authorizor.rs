use oso::{Oso, PolarClass};

use crate::auth::Requester;
use crate::entities::Place;
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Requester::get_polar_class())?;
    o.register_class(Place::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}
