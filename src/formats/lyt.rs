//! `LYT`: a plain-text room/track/obstacle/door-hook layout for a module
//! area. Unlike the other `C5` formats this one is ASCII, not binary.

use kotor_common::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct RoomEntry {
    pub model: String,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoorHookEntry {
    pub room: String,
    pub name: String,
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lyt {
    pub rooms: Vec<RoomEntry>,
    pub tracks: Vec<RoomEntry>,
    pub obstacles: Vec<RoomEntry>,
    pub door_hooks: Vec<DoorHookEntry>,
}

impl Lyt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(text: &str) -> Result<Self, Error> {
        let mut tokens = text.split_whitespace().peekable();
        let mut lyt = Lyt::new();

        while let Some(token) = tokens.next() {
            match token.to_ascii_lowercase().as_str() {
                "roomcount" => {
                    let count = read_count(&mut tokens)?;
                    for _ in 0..count {
                        lyt.rooms.push(read_room_entry(&mut tokens)?);
                    }
                }
                "trackcount" => {
                    let count = read_count(&mut tokens)?;
                    for _ in 0..count {
                        lyt.tracks.push(read_room_entry(&mut tokens)?);
                    }
                }
                "obstaclecount" => {
                    let count = read_count(&mut tokens)?;
                    for _ in 0..count {
                        lyt.obstacles.push(read_room_entry(&mut tokens)?);
                    }
                }
                "doorhookcount" => {
                    let count = read_count(&mut tokens)?;
                    for _ in 0..count {
                        lyt.door_hooks.push(read_door_hook_entry(&mut tokens)?);
                    }
                }
                "filedependancy" => {
                    tokens.next();
                }
                "beginlayout" | "donelayout" => {}
                other => {
                    return Err(Error::StructuralError(format!("unrecognized LYT token {other:?}")));
                }
            }
        }
        Ok(lyt)
    }

    pub fn write(&self) -> String {
        let mut out = String::new();
        out.push_str("beginlayout\r\n");
        out.push_str(&format!("   roomcount {}\r\n", self.rooms.len()));
        for room in &self.rooms {
            out.push_str(&format!(
                "   {} {} {} {}\r\n",
                room.model, room.position[0], room.position[1], room.position[2]
            ));
        }
        out.push_str(&format!("   trackcount {}\r\n", self.tracks.len()));
        for track in &self.tracks {
            out.push_str(&format!(
                "   {} {} {} {}\r\n",
                track.model, track.position[0], track.position[1], track.position[2]
            ));
        }
        out.push_str(&format!("   obstaclecount {}\r\n", self.obstacles.len()));
        for obstacle in &self.obstacles {
            out.push_str(&format!(
                "   {} {} {} {}\r\n",
                obstacle.model, obstacle.position[0], obstacle.position[1], obstacle.position[2]
            ));
        }
        out.push_str(&format!("   doorhookcount {}\r\n", self.door_hooks.len()));
        for hook in &self.door_hooks {
            out.push_str(&format!(
                "   {} {} 0 {} {} {} {} {} {} {}\r\n",
                hook.room,
                hook.name,
                hook.position[0],
                hook.position[1],
                hook.position[2],
                hook.orientation[0],
                hook.orientation[1],
                hook.orientation[2],
                hook.orientation[3]
            ));
        }
        out.push_str("donelayout\r\n");
        out
    }
}

fn read_count<'a>(tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>) -> Result<usize, Error> {
    tokens
        .next()
        .ok_or_else(|| Error::StructuralError(String::from("LYT count missing after keyword")))?
        .parse::<usize>()
        .map_err(|_| Error::StructuralError(String::from("LYT count is not an integer")))
}

fn read_f32<'a>(tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>) -> Result<f32, Error> {
    tokens
        .next()
        .ok_or_else(|| Error::StructuralError(String::from("LYT entry truncated")))?
        .parse::<f32>()
        .map_err(|_| Error::StructuralError(String::from("LYT entry has a non-numeric component")))
}

fn read_room_entry<'a>(tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>) -> Result<RoomEntry, Error> {
    let model = tokens
        .next()
        .ok_or_else(|| Error::StructuralError(String::from("LYT entry missing model name")))?
        .to_string();
    let position = [read_f32(tokens)?, read_f32(tokens)?, read_f32(tokens)?];
    Ok(RoomEntry { model, position })
}

fn read_door_hook_entry<'a>(
    tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>,
) -> Result<DoorHookEntry, Error> {
    let room = tokens
        .next()
        .ok_or_else(|| Error::StructuralError(String::from("door hook missing room name")))?
        .to_string();
    let name = tokens
        .next()
        .ok_or_else(|| Error::StructuralError(String::from("door hook missing name")))?
        .to_string();
    tokens.next().ok_or_else(|| Error::StructuralError(String::from("door hook missing unused placeholder token")))?;
    let position = [read_f32(tokens)?, read_f32(tokens)?, read_f32(tokens)?];
    let orientation = [read_f32(tokens)?, read_f32(tokens)?, read_f32(tokens)?, read_f32(tokens)?];
    Ok(DoorHookEntry { room, name, position, orientation })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_rooms_and_door_hooks() {
        let mut lyt = Lyt::new();
        lyt.rooms.push(RoomEntry { model: String::from("m01aa_01a"), position: [0.0, 0.0, 0.0] });
        lyt.door_hooks.push(DoorHookEntry {
            room: String::from("m01aa_01a"),
            name: String::from("door01"),
            position: [1.0, 2.0, 3.0],
            orientation: [0.0, 0.0, 1.0, 0.0],
        });

        let text = lyt.write();
        let read_back = Lyt::read(&text).unwrap();
        assert_eq!(read_back.rooms, lyt.rooms);
        assert_eq!(read_back.door_hooks, lyt.door_hooks);
    }

    #[test]
    fn test_door_hook_line_has_placeholder_and_full_orientation() {
        let text = "beginlayout\nroomcount 0\ntrackcount 0\nobstaclecount 0\ndoorhookcount 1\nm01aa_01a door01 0 1.0 2.0 3.0 0.1 0.2 0.3 0.4\ndonelayout";
        let lyt = Lyt::read(text).unwrap();
        assert_eq!(
            lyt.door_hooks[0],
            DoorHookEntry {
                room: String::from("m01aa_01a"),
                name: String::from("door01"),
                position: [1.0, 2.0, 3.0],
                orientation: [0.1, 0.2, 0.3, 0.4],
            }
        );
    }

    #[test]
    fn test_tolerates_extra_whitespace() {
        let text = "beginlayout\n  roomcount   1\n   room_a   1.0  2.0   3.0 \ntrackcount 0\nobstaclecount 0\ndoorhookcount 0\ndonelayout";
        let lyt = Lyt::read(text).unwrap();
        assert_eq!(lyt.rooms.len(), 1);
        assert_eq!(lyt.rooms[0].model, "room_a");
    }

    #[test]
    fn test_rejects_unknown_token() {
        let result = Lyt::read("bogustoken 1");
        assert!(matches!(result, Err(Error::StructuralError(_))));
    }
}
