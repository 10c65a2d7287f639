//! Engine class ids
//!
//! Serialized objects declare their class by a numeric id fixed by the
//! engine. Names are only used for display; decoding always goes through the
//! file's own type tree.

use phf::phf_map;

pub const GAME_OBJECT: i32 = 1;
pub const TRANSFORM: i32 = 4;
pub const MATERIAL: i32 = 21;
pub const TEXTURE_2D: i32 = 28;
pub const MESH: i32 = 43;
pub const TEXT_ASSET: i32 = 49;
pub const ANIMATION_CLIP: i32 = 74;
pub const AVATAR: i32 = 90;
pub const MONO_BEHAVIOUR: i32 = 114;
pub const MONO_SCRIPT: i32 = 115;
pub const SKINNED_MESH_RENDERER: i32 = 137;
pub const BUILD_SETTINGS: i32 = 141;
pub const ASSET_BUNDLE: i32 = 142;
pub const SPRITE: i32 = 213;

static CLASS_NAMES: phf::Map<i32, &'static str> = phf_map! {
    1i32 => "GameObject",
    2i32 => "Component",
    3i32 => "LevelGameManager",
    4i32 => "Transform",
    5i32 => "TimeManager",
    6i32 => "GlobalGameManager",
    8i32 => "Behaviour",
    9i32 => "GameManager",
    11i32 => "AudioManager",
    12i32 => "ParticleAnimator",
    13i32 => "InputManager",
    15i32 => "EllipsoidParticleEmitter",
    17i32 => "Pipeline",
    18i32 => "EditorExtension",
    19i32 => "Physics2DSettings",
    20i32 => "Camera",
    21i32 => "Material",
    23i32 => "MeshRenderer",
    25i32 => "Renderer",
    26i32 => "ParticleRenderer",
    27i32 => "Texture",
    28i32 => "Texture2D",
    29i32 => "SceneSettings",
    30i32 => "GraphicsSettings",
    33i32 => "MeshFilter",
    41i32 => "OcclusionPortal",
    43i32 => "Mesh",
    45i32 => "Skybox",
    47i32 => "QualitySettings",
    48i32 => "Shader",
    49i32 => "TextAsset",
    50i32 => "Rigidbody2D",
    53i32 => "Collider2D",
    54i32 => "Rigidbody",
    55i32 => "PhysicsManager",
    56i32 => "Collider",
    57i32 => "Joint",
    58i32 => "CircleCollider2D",
    59i32 => "HingeJoint",
    60i32 => "PolygonCollider2D",
    61i32 => "BoxCollider2D",
    62i32 => "PhysicsMaterial2D",
    64i32 => "MeshCollider",
    65i32 => "BoxCollider",
    68i32 => "EdgeCollider2D",
    72i32 => "ComputeShader",
    74i32 => "AnimationClip",
    78i32 => "TagManager",
    81i32 => "AudioListener",
    82i32 => "AudioSource",
    83i32 => "AudioClip",
    84i32 => "RenderTexture",
    89i32 => "Cubemap",
    90i32 => "Avatar",
    91i32 => "AnimatorController",
    93i32 => "RuntimeAnimatorController",
    94i32 => "ScriptMapper",
    95i32 => "Animator",
    96i32 => "TrailRenderer",
    98i32 => "DelayedCallManager",
    102i32 => "TextMesh",
    104i32 => "RenderSettings",
    108i32 => "Light",
    109i32 => "CGProgram",
    110i32 => "BaseAnimationTrack",
    111i32 => "Animation",
    114i32 => "MonoBehaviour",
    115i32 => "MonoScript",
    116i32 => "MonoManager",
    117i32 => "Texture3D",
    118i32 => "NewAnimationTrack",
    119i32 => "Projector",
    120i32 => "LineRenderer",
    121i32 => "Flare",
    122i32 => "Halo",
    123i32 => "LensFlare",
    124i32 => "FlareLayer",
    128i32 => "Font",
    129i32 => "PlayerSettings",
    130i32 => "NamedObject",
    131i32 => "GUITexture",
    132i32 => "GUIText",
    133i32 => "GUIElement",
    134i32 => "PhysicMaterial",
    135i32 => "SphereCollider",
    136i32 => "CapsuleCollider",
    137i32 => "SkinnedMeshRenderer",
    141i32 => "BuildSettings",
    142i32 => "AssetBundle",
    143i32 => "CharacterController",
    147i32 => "ResourceManager",
    150i32 => "PreloadData",
    152i32 => "MovieTexture",
    153i32 => "ConfigurableJoint",
    156i32 => "TerrainData",
    157i32 => "LightmapSettings",
    158i32 => "WebCamTexture",
    159i32 => "EditorSettings",
    164i32 => "AudioReverbFilter",
    180i32 => "AudioReverbZone",
    183i32 => "Cloth",
    198i32 => "ParticleSystem",
    199i32 => "ParticleSystemRenderer",
    200i32 => "ShaderVariantCollection",
    205i32 => "LODGroup",
    206i32 => "BlendTree",
    207i32 => "Motion",
    208i32 => "NavMeshObstacle",
    212i32 => "SpriteRenderer",
    213i32 => "Sprite",
    215i32 => "ReflectionProbe",
    218i32 => "Terrain",
    220i32 => "LightProbeGroup",
    221i32 => "AnimatorOverrideController",
    222i32 => "CanvasRenderer",
    223i32 => "Canvas",
    224i32 => "RectTransform",
    225i32 => "CanvasGroup",
    226i32 => "BillboardAsset",
    227i32 => "BillboardRenderer",
    238i32 => "NavMeshData",
    240i32 => "AudioMixer",
    241i32 => "AudioMixerController",
    243i32 => "AudioMixerGroupController",
    258i32 => "LightProbes",
    272i32 => "AudioMixerSnapshot",
    290i32 => "AssetBundleManifest",
    319i32 => "AvatarMask",
    328i32 => "VideoPlayer",
    329i32 => "VideoClip",
    363i32 => "OcclusionCullingData",
    1001i32 => "Prefab",
};

/// Name of a known class id
pub fn class_name(id: i32) -> Option<&'static str> {
    CLASS_NAMES.get(&id).copied()
}

/// Display name of a class id, `#<id>` when unknown
pub fn display_name(id: i32) -> String {
    match class_name(id) {
        Some(name) => name.to_string(),
        None => format!("#{id}"),
    }
}

pub fn is_known(id: i32) -> bool {
    CLASS_NAMES.contains_key(&id)
}
