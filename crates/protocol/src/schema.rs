//! Payload schemas, one struct per command kind.
//!
//! `decode` is the authority for validity: a value it returns has passed every
//! field rule and the payload was consumed exactly. `encode` is its inverse and
//! reproduces the same bytes for any value `decode` accepts. Fields are written
//! in declaration order, signed fields as VarInt and unsigned fields as VarUInt.

use serde::{Deserialize, Serialize};

use crate::wire::{WireError, WireReader, WireWriter};

/// Bit set in [`MotionInputPayload::input_flags`] while jump is held.
pub const INPUT_FLAG_JUMP: u8 = 0b0000_0001;

/// Largest magnitude accepted for [`MotionInputPayload::move_axis_milli`].
pub const MOVE_AXIS_LIMIT_MILLI: i32 = 1000;

/// Encode/decode pair shared by every payload struct.
pub trait CommandPayload: Sized {
    fn write(&self, w: &mut WireWriter);

    /// Read and validate the fields. Does not check for trailing bytes.
    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(16);
        self.write(&mut w);
        w.into_bytes()
    }

    fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(payload);
        let value = Self::read(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

/// Decode a payload for a tag-only command: nothing but an empty buffer passes.
pub fn decode_empty(payload: &[u8]) -> Result<(), WireError> {
    WireReader::new(payload).finish()
}

fn nonzero_u16(value: u16, field: &'static str) -> Result<u16, WireError> {
    if value == 0 {
        return Err(WireError::Invalid {
            field,
            reason: "must be nonzero",
        });
    }
    Ok(value)
}

fn nonzero_u32(value: u32, field: &'static str) -> Result<u32, WireError> {
    if value == 0 {
        return Err(WireError::Invalid {
            field,
            reason: "must be nonzero",
        });
    }
    Ok(value)
}

/// u8 fields travel as VarUInt, which is wider than the field; re-check here
/// rather than relying on the narrowing read.
fn read_byte_field(r: &mut WireReader<'_>, field: &'static str) -> Result<u8, WireError> {
    let raw = r.read_var_uint()?;
    u8::try_from(raw).map_err(|_| WireError::Invalid {
        field,
        reason: "exceeds 255",
    })
}

/// `world.set_tile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTilePayload {
    pub tile_x: i32,
    pub tile_y: i32,
    pub material_id: u16,
}

impl CommandPayload for SetTilePayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.tile_x));
        w.write_var_int(i64::from(self.tile_y));
        w.write_var_uint(u64::from(self.material_id));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            tile_x: r.read_i32()?,
            tile_y: r.read_i32()?,
            material_id: r.read_u16()?,
        })
    }
}

impl From<SetTilePayload> for tileworld_common::TileMutation {
    fn from(p: SetTilePayload) -> Self {
        Self {
            tile_x: p.tile_x,
            tile_y: p.tile_y,
            material_id: p.material_id,
        }
    }
}

/// `world.load_chunk` and `world.unload_chunk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRequestPayload {
    pub chunk_x: i32,
    pub chunk_y: i32,
}

impl ChunkRequestPayload {
    pub fn coord(&self) -> tileworld_common::ChunkCoord {
        tileworld_common::ChunkCoord::new(self.chunk_x, self.chunk_y)
    }
}

impl From<tileworld_common::ChunkCoord> for ChunkRequestPayload {
    fn from(c: tileworld_common::ChunkCoord) -> Self {
        Self {
            chunk_x: c.x,
            chunk_y: c.y,
        }
    }
}

impl CommandPayload for ChunkRequestPayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.chunk_x));
        w.write_var_int(i64::from(self.chunk_y));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            chunk_x: r.read_i32()?,
            chunk_y: r.read_i32()?,
        })
    }
}

/// `gameplay.collect_resource`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectResourcePayload {
    pub resource_id: u16,
    pub amount: u32,
}

impl CommandPayload for CollectResourcePayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_uint(u64::from(self.resource_id));
        w.write_var_uint(u64::from(self.amount));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            resource_id: nonzero_u16(r.read_u16()?, "resource_id")?,
            amount: nonzero_u32(r.read_u32()?, "amount")?,
        })
    }
}

/// `gameplay.spawn_drop`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnDropPayload {
    pub tile_x: i32,
    pub tile_y: i32,
    pub material_id: u16,
    pub amount: u32,
}

impl CommandPayload for SpawnDropPayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.tile_x));
        w.write_var_int(i64::from(self.tile_y));
        w.write_var_uint(u64::from(self.material_id));
        w.write_var_uint(u64::from(self.amount));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            tile_x: r.read_i32()?,
            tile_y: r.read_i32()?,
            material_id: nonzero_u16(r.read_u16()?, "material_id")?,
            amount: nonzero_u32(r.read_u32()?, "amount")?,
        })
    }
}

/// `gameplay.pickup_probe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupProbePayload {
    pub tile_x: i32,
    pub tile_y: i32,
}

impl CommandPayload for PickupProbePayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.tile_x));
        w.write_var_int(i64::from(self.tile_y));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            tile_x: r.read_i32()?,
            tile_y: r.read_i32()?,
        })
    }
}

/// `gameplay.interaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPayload {
    pub interaction_type: u16,
    pub target_tile_x: i32,
    pub target_tile_y: i32,
    pub target_material_id: u16,
    pub result_code: u16,
}

impl CommandPayload for InteractionPayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_uint(u64::from(self.interaction_type));
        w.write_var_int(i64::from(self.target_tile_x));
        w.write_var_int(i64::from(self.target_tile_y));
        w.write_var_uint(u64::from(self.target_material_id));
        w.write_var_uint(u64::from(self.result_code));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            interaction_type: r.read_u16()?,
            target_tile_x: r.read_i32()?,
            target_tile_y: r.read_i32()?,
            target_material_id: r.read_u16()?,
            result_code: r.read_u16()?,
        })
    }
}

/// `player.motion_input`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionInputPayload {
    pub move_axis_milli: i32,
    pub input_flags: u8,
}

impl MotionInputPayload {
    pub fn jump_pressed(&self) -> bool {
        self.input_flags & INPUT_FLAG_JUMP != 0
    }
}

impl CommandPayload for MotionInputPayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.move_axis_milli));
        w.write_var_uint(u64::from(self.input_flags));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let move_axis_milli = r.read_i32()?;
        if !(-MOVE_AXIS_LIMIT_MILLI..=MOVE_AXIS_LIMIT_MILLI).contains(&move_axis_milli) {
            return Err(WireError::Invalid {
                field: "move_axis_milli",
                reason: "outside [-1000, 1000]",
            });
        }
        let input_flags = read_byte_field(r, "input_flags")?;
        if input_flags & !INPUT_FLAG_JUMP != 0 {
            return Err(WireError::Invalid {
                field: "input_flags",
                reason: "undefined bit set",
            });
        }
        Ok(Self {
            move_axis_milli,
            input_flags,
        })
    }
}

/// `gameplay.action_primary`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPrimaryPayload {
    pub target_tile_x: i32,
    pub target_tile_y: i32,
    pub hotbar_row: u8,
    pub hotbar_slot: u8,
}

impl CommandPayload for ActionPrimaryPayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.target_tile_x));
        w.write_var_int(i64::from(self.target_tile_y));
        w.write_var_uint(u64::from(self.hotbar_row));
        w.write_var_uint(u64::from(self.hotbar_slot));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            target_tile_x: r.read_i32()?,
            target_tile_y: r.read_i32()?,
            hotbar_row: read_byte_field(r, "hotbar_row")?,
            hotbar_slot: read_byte_field(r, "hotbar_slot")?,
        })
    }
}

/// `gameplay.craft_recipe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftRecipePayload {
    pub recipe_index: u8,
}

impl CommandPayload for CraftRecipePayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_uint(u64::from(self.recipe_index));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            recipe_index: read_byte_field(r, "recipe_index")?,
        })
    }
}

/// `combat.fire_projectile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireProjectilePayload {
    pub origin_tile_x: i32,
    pub origin_tile_y: i32,
    pub velocity_milli_x: i32,
    pub velocity_milli_y: i32,
    pub damage: u16,
    pub lifetime_ticks: u16,
    pub faction: u16,
}

impl CommandPayload for FireProjectilePayload {
    fn write(&self, w: &mut WireWriter) {
        w.write_var_int(i64::from(self.origin_tile_x));
        w.write_var_int(i64::from(self.origin_tile_y));
        w.write_var_int(i64::from(self.velocity_milli_x));
        w.write_var_int(i64::from(self.velocity_milli_y));
        w.write_var_uint(u64::from(self.damage));
        w.write_var_uint(u64::from(self.lifetime_ticks));
        w.write_var_uint(u64::from(self.faction));
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            origin_tile_x: r.read_i32()?,
            origin_tile_y: r.read_i32()?,
            velocity_milli_x: r.read_i32()?,
            velocity_milli_y: r.read_i32()?,
            damage: nonzero_u16(r.read_u16()?, "damage")?,
            lifetime_ticks: nonzero_u16(r.read_u16()?, "lifetime_ticks")?,
            faction: nonzero_u16(r.read_u16()?, "faction")?,
        })
    }
}
