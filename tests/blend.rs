extern crate glcanvas;
extern crate serde_json;

use std::convert::TryFrom;

use glcanvas::prelude::*;
use glcanvas::video::errors::Error;

#[test]
fn factors() {
    use glcanvas::video::blend::BlendFactor::{One, OneMinusValue, Value, Zero};
    use glcanvas::video::blend::BlendValue::{DestinationAlpha, SourceAlpha};

    let table = [
        (ComposeMethod::Over, One, OneMinusValue(SourceAlpha)),
        (ComposeMethod::In, Value(DestinationAlpha), Zero),
        (ComposeMethod::Out, OneMinusValue(DestinationAlpha), Zero),
        (
            ComposeMethod::Atop,
            Value(DestinationAlpha),
            OneMinusValue(SourceAlpha),
        ),
        (ComposeMethod::RoverOver, OneMinusValue(DestinationAlpha), One),
        (ComposeMethod::Rin, Zero, Value(SourceAlpha)),
        (ComposeMethod::Rout, Zero, OneMinusValue(SourceAlpha)),
        (
            ComposeMethod::Ratop,
            OneMinusValue(DestinationAlpha),
            Value(SourceAlpha),
        ),
        (
            ComposeMethod::Xor,
            OneMinusValue(DestinationAlpha),
            OneMinusValue(SourceAlpha),
        ),
        (ComposeMethod::Plus, One, One),
        (ComposeMethod::Copy, One, Zero),
    ];

    for &(method, src, dst) in table.iter() {
        assert_eq!(blend_factors(method), (src, dst), "{}", method);
        assert_eq!(method.factors(), (src, dst));
    }

    assert_eq!(ComposeMethod::default(), ComposeMethod::Over);
}

#[test]
fn parse() {
    for (i, &method) in ComposeMethod::ALL.iter().enumerate() {
        assert_eq!(method.to_string().parse::<ComposeMethod>().unwrap(), method);
        assert_eq!(ComposeMethod::try_from(i as u8).unwrap(), method);
    }

    assert_eq!("PLUS".parse::<ComposeMethod>().unwrap(), ComposeMethod::Plus);

    match "lighten".parse::<ComposeMethod>() {
        Err(Error::ComposeMethodInvalid(ref v)) if v == "lighten" => {}
        other => panic!("unexpected {:?}", other),
    }

    match ComposeMethod::try_from(11) {
        Err(Error::ComposeMethodInvalid(ref v)) if v == "11" => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn serde() {
    let json = serde_json::to_string(&ComposeMethod::Ratop).unwrap();
    let method: ComposeMethod = serde_json::from_str(&json).unwrap();
    assert_eq!(method, ComposeMethod::Ratop);
}
