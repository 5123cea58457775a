use serde::{Deserialize, Serialize};
use tileworld_common::PlayerCommand;

use crate::schema::{
    ActionPrimaryPayload, ChunkRequestPayload, CollectResourcePayload, CommandPayload,
    CraftRecipePayload, FireProjectilePayload, InteractionPayload, MotionInputPayload,
    PickupProbePayload, SetTilePayload, SpawnDropPayload, decode_empty,
};
use crate::wire::WireError;

/// Closed set of command kinds known to this decoder.
///
/// Kinds are identified on the wire by a stable string tag rather than a
/// numeric id, so an older decoder rejects a newer tag instead of
/// misreading its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Jump,
    Attack,
    PlayerMotionInput,
    WorldSetTile,
    WorldLoadChunk,
    WorldUnloadChunk,
    GameplayCollectResource,
    GameplaySpawnDrop,
    GameplayPickupProbe,
    GameplayInteraction,
    GameplayActionPrimary,
    GameplayCraftRecipe,
    GameplayBuildWorkbench,
    GameplayCraftSword,
    GameplayAttackEnemy,
    GameplayAttackBoss,
    CombatFireProjectile,
}

impl CommandKind {
    pub const ALL: [CommandKind; 17] = [
        CommandKind::Jump,
        CommandKind::Attack,
        CommandKind::PlayerMotionInput,
        CommandKind::WorldSetTile,
        CommandKind::WorldLoadChunk,
        CommandKind::WorldUnloadChunk,
        CommandKind::GameplayCollectResource,
        CommandKind::GameplaySpawnDrop,
        CommandKind::GameplayPickupProbe,
        CommandKind::GameplayInteraction,
        CommandKind::GameplayActionPrimary,
        CommandKind::GameplayCraftRecipe,
        CommandKind::GameplayBuildWorkbench,
        CommandKind::GameplayCraftSword,
        CommandKind::GameplayAttackEnemy,
        CommandKind::GameplayAttackBoss,
        CommandKind::CombatFireProjectile,
    ];

    /// Wire tag carried in [`PlayerCommand::command_type`].
    pub fn tag(self) -> &'static str {
        match self {
            CommandKind::Jump => "jump",
            CommandKind::Attack => "attack",
            CommandKind::PlayerMotionInput => "player.motion_input",
            CommandKind::WorldSetTile => "world.set_tile",
            CommandKind::WorldLoadChunk => "world.load_chunk",
            CommandKind::WorldUnloadChunk => "world.unload_chunk",
            CommandKind::GameplayCollectResource => "gameplay.collect_resource",
            CommandKind::GameplaySpawnDrop => "gameplay.spawn_drop",
            CommandKind::GameplayPickupProbe => "gameplay.pickup_probe",
            CommandKind::GameplayInteraction => "gameplay.interaction",
            CommandKind::GameplayActionPrimary => "gameplay.action_primary",
            CommandKind::GameplayCraftRecipe => "gameplay.craft_recipe",
            CommandKind::GameplayBuildWorkbench => "gameplay.build_workbench",
            CommandKind::GameplayCraftSword => "gameplay.craft_sword",
            CommandKind::GameplayAttackEnemy => "gameplay.attack_enemy",
            CommandKind::GameplayAttackBoss => "gameplay.attack_boss",
            CommandKind::CombatFireProjectile => "combat.fire_projectile",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "jump" => CommandKind::Jump,
            "attack" => CommandKind::Attack,
            "player.motion_input" => CommandKind::PlayerMotionInput,
            "world.set_tile" => CommandKind::WorldSetTile,
            "world.load_chunk" => CommandKind::WorldLoadChunk,
            "world.unload_chunk" => CommandKind::WorldUnloadChunk,
            "gameplay.collect_resource" => CommandKind::GameplayCollectResource,
            "gameplay.spawn_drop" => CommandKind::GameplaySpawnDrop,
            "gameplay.pickup_probe" => CommandKind::GameplayPickupProbe,
            "gameplay.interaction" => CommandKind::GameplayInteraction,
            "gameplay.action_primary" => CommandKind::GameplayActionPrimary,
            "gameplay.craft_recipe" => CommandKind::GameplayCraftRecipe,
            "gameplay.build_workbench" => CommandKind::GameplayBuildWorkbench,
            "gameplay.craft_sword" => CommandKind::GameplayCraftSword,
            "gameplay.attack_enemy" => CommandKind::GameplayAttackEnemy,
            "gameplay.attack_boss" => CommandKind::GameplayAttackBoss,
            "combat.fire_projectile" => CommandKind::CombatFireProjectile,
            _ => return None,
        })
    }
}

/// A validated command. Downstream consumers never re-validate the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedPlayerCommand {
    Jump,
    Attack,
    PlayerMotionInput(MotionInputPayload),
    WorldSetTile(SetTilePayload),
    WorldLoadChunk(ChunkRequestPayload),
    WorldUnloadChunk(ChunkRequestPayload),
    GameplayCollectResource(CollectResourcePayload),
    GameplaySpawnDrop(SpawnDropPayload),
    GameplayPickupProbe(PickupProbePayload),
    GameplayInteraction(InteractionPayload),
    GameplayActionPrimary(ActionPrimaryPayload),
    GameplayCraftRecipe(CraftRecipePayload),
    GameplayBuildWorkbench,
    GameplayCraftSword,
    GameplayAttackEnemy,
    GameplayAttackBoss,
    CombatFireProjectile(FireProjectilePayload),
}

impl TypedPlayerCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            TypedPlayerCommand::Jump => CommandKind::Jump,
            TypedPlayerCommand::Attack => CommandKind::Attack,
            TypedPlayerCommand::PlayerMotionInput(_) => CommandKind::PlayerMotionInput,
            TypedPlayerCommand::WorldSetTile(_) => CommandKind::WorldSetTile,
            TypedPlayerCommand::WorldLoadChunk(_) => CommandKind::WorldLoadChunk,
            TypedPlayerCommand::WorldUnloadChunk(_) => CommandKind::WorldUnloadChunk,
            TypedPlayerCommand::GameplayCollectResource(_) => CommandKind::GameplayCollectResource,
            TypedPlayerCommand::GameplaySpawnDrop(_) => CommandKind::GameplaySpawnDrop,
            TypedPlayerCommand::GameplayPickupProbe(_) => CommandKind::GameplayPickupProbe,
            TypedPlayerCommand::GameplayInteraction(_) => CommandKind::GameplayInteraction,
            TypedPlayerCommand::GameplayActionPrimary(_) => CommandKind::GameplayActionPrimary,
            TypedPlayerCommand::GameplayCraftRecipe(_) => CommandKind::GameplayCraftRecipe,
            TypedPlayerCommand::GameplayBuildWorkbench => CommandKind::GameplayBuildWorkbench,
            TypedPlayerCommand::GameplayCraftSword => CommandKind::GameplayCraftSword,
            TypedPlayerCommand::GameplayAttackEnemy => CommandKind::GameplayAttackEnemy,
            TypedPlayerCommand::GameplayAttackBoss => CommandKind::GameplayAttackBoss,
            TypedPlayerCommand::CombatFireProjectile(_) => CommandKind::CombatFireProjectile,
        }
    }

    /// Wire payload for this command. Tag-only kinds encode to an empty buffer.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            TypedPlayerCommand::Jump
            | TypedPlayerCommand::Attack
            | TypedPlayerCommand::GameplayBuildWorkbench
            | TypedPlayerCommand::GameplayCraftSword
            | TypedPlayerCommand::GameplayAttackEnemy
            | TypedPlayerCommand::GameplayAttackBoss => Vec::new(),
            TypedPlayerCommand::PlayerMotionInput(p) => p.encode(),
            TypedPlayerCommand::WorldSetTile(p) => p.encode(),
            TypedPlayerCommand::WorldLoadChunk(p) | TypedPlayerCommand::WorldUnloadChunk(p) => {
                p.encode()
            }
            TypedPlayerCommand::GameplayCollectResource(p) => p.encode(),
            TypedPlayerCommand::GameplaySpawnDrop(p) => p.encode(),
            TypedPlayerCommand::GameplayPickupProbe(p) => p.encode(),
            TypedPlayerCommand::GameplayInteraction(p) => p.encode(),
            TypedPlayerCommand::GameplayActionPrimary(p) => p.encode(),
            TypedPlayerCommand::GameplayCraftRecipe(p) => p.encode(),
            TypedPlayerCommand::CombatFireProjectile(p) => p.encode(),
        }
    }

    /// Wrap into a transport envelope for the given player.
    pub fn to_player_command(&self, player_id: u32) -> PlayerCommand {
        PlayerCommand::new(player_id, self.kind().tag(), self.encode_payload())
    }
}

/// Output of [`decode_player_command`]: the sender plus the validated command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedCommand {
    pub player_id: u32,
    pub command: TypedPlayerCommand,
}

/// Map a raw envelope onto its typed variant.
///
/// Unknown tags and payloads failing schema validation are both plain errors;
/// the caller rejects the command and nothing is applied.
pub fn decode_player_command(command: &PlayerCommand) -> Result<DecodedCommand, WireError> {
    let kind = CommandKind::from_tag(&command.command_type)
        .ok_or_else(|| WireError::UnknownCommand(command.command_type.clone()))?;
    let payload = command.payload.as_slice();

    let typed = match kind {
        CommandKind::Jump => decode_empty(payload).map(|()| TypedPlayerCommand::Jump)?,
        CommandKind::Attack => decode_empty(payload).map(|()| TypedPlayerCommand::Attack)?,
        CommandKind::PlayerMotionInput => {
            TypedPlayerCommand::PlayerMotionInput(MotionInputPayload::decode(payload)?)
        }
        CommandKind::WorldSetTile => {
            TypedPlayerCommand::WorldSetTile(SetTilePayload::decode(payload)?)
        }
        CommandKind::WorldLoadChunk => {
            TypedPlayerCommand::WorldLoadChunk(ChunkRequestPayload::decode(payload)?)
        }
        CommandKind::WorldUnloadChunk => {
            TypedPlayerCommand::WorldUnloadChunk(ChunkRequestPayload::decode(payload)?)
        }
        CommandKind::GameplayCollectResource => {
            TypedPlayerCommand::GameplayCollectResource(CollectResourcePayload::decode(payload)?)
        }
        CommandKind::GameplaySpawnDrop => {
            TypedPlayerCommand::GameplaySpawnDrop(SpawnDropPayload::decode(payload)?)
        }
        CommandKind::GameplayPickupProbe => {
            TypedPlayerCommand::GameplayPickupProbe(PickupProbePayload::decode(payload)?)
        }
        CommandKind::GameplayInteraction => {
            TypedPlayerCommand::GameplayInteraction(InteractionPayload::decode(payload)?)
        }
        CommandKind::GameplayActionPrimary => {
            TypedPlayerCommand::GameplayActionPrimary(ActionPrimaryPayload::decode(payload)?)
        }
        CommandKind::GameplayCraftRecipe => {
            TypedPlayerCommand::GameplayCraftRecipe(CraftRecipePayload::decode(payload)?)
        }
        CommandKind::GameplayBuildWorkbench => {
            decode_empty(payload).map(|()| TypedPlayerCommand::GameplayBuildWorkbench)?
        }
        CommandKind::GameplayCraftSword => {
            decode_empty(payload).map(|()| TypedPlayerCommand::GameplayCraftSword)?
        }
        CommandKind::GameplayAttackEnemy => {
            decode_empty(payload).map(|()| TypedPlayerCommand::GameplayAttackEnemy)?
        }
        CommandKind::GameplayAttackBoss => {
            decode_empty(payload).map(|()| TypedPlayerCommand::GameplayAttackBoss)?
        }
        CommandKind::CombatFireProjectile => {
            TypedPlayerCommand::CombatFireProjectile(FireProjectilePayload::decode(payload)?)
        }
    };

    Ok(DecodedCommand {
        player_id: command.player_id,
        command: typed,
    })
}
