//! A named animation clip: its own geometry-header-shaped metadata, a node
//! tree shaped like the model's own tree (same node numbers, position-only
//! payloads carrying controllers), and a list of timed script events.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::controller::Controller;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
    pub time: f32,
    pub name: String,
}

/// One node's worth of animation data: no geometry, just the controllers
/// driving whichever node shares its `node_number` in the model tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimNode {
    pub node_number: u16,
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub controllers: Vec<Controller>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub length: f32,
    pub transition_time: f32,
    pub anim_root: String,
    pub events: Vec<AnimationEvent>,
    pub nodes: Vec<AnimNode>,
    pub root: usize,
}

impl Animation {
    pub fn node(&self, index: usize) -> &AnimNode {
        &self.nodes[index]
    }

    pub fn find_by_number(&self, node_number: u16) -> Option<usize> {
        self.nodes.iter().position(|n| n.node_number == node_number)
    }

    pub fn read_event(reader: &mut ByteReader) -> Result<AnimationEvent, Error> {
        let time = reader.single()?;
        let name = reader.string(32)?;
        Ok(AnimationEvent { time, name })
    }

    pub fn write_event(writer: &mut ByteWriter, event: &AnimationEvent) -> Result<(), Error> {
        writer.single(event.time)?;
        writer.string(&event.name, 32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trips() {
        let event = AnimationEvent { time: 1.5, name: "fire".to_string() };
        let mut writer = ByteWriter::new();
        Animation::write_event(&mut writer, &event).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let read_back = Animation::read_event(&mut reader).unwrap();
        assert_eq!(read_back, event);
    }

    #[test]
    fn test_find_by_number() {
        let anim = Animation {
            name: "walk".to_string(),
            length: 1.0,
            transition_time: 0.25,
            anim_root: "root".to_string(),
            events: Vec::new(),
            nodes: vec![AnimNode { node_number: 3, name: "hand_l".to_string(), parent: None, children: Vec::new(), controllers: Vec::new() }],
            root: 0,
        };
        assert_eq!(anim.find_by_number(3), Some(0));
        assert_eq!(anim.find_by_number(99), None);
    }
}
