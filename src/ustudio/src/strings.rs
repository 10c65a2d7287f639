//! Built-in type-tree string table
//!
//! Compact type trees refer to common type and member names by offset into
//! a string block shipped with the engine instead of embedding them.

use phf::phf_map;

static COMMON_STRINGS: phf::Map<u32, &'static str> = phf_map! {
    0u32 => "AABB",
    5u32 => "AnimationClip",
    19u32 => "AnimationCurve",
    34u32 => "AnimationState",
    49u32 => "Array",
    55u32 => "Base",
    60u32 => "BitField",
    69u32 => "bitset",
    76u32 => "bool",
    81u32 => "char",
    86u32 => "ColorRGBA",
    96u32 => "Component",
    106u32 => "data",
    111u32 => "deque",
    117u32 => "double",
    124u32 => "dynamic_array",
    138u32 => "FastPropertyName",
    155u32 => "first",
    161u32 => "float",
    167u32 => "Font",
    172u32 => "GameObject",
    183u32 => "Generic Mono",
    196u32 => "GradientNEW",
    208u32 => "GUID",
    213u32 => "GUIStyle",
    222u32 => "int",
    226u32 => "list",
    231u32 => "long long",
    241u32 => "map",
    245u32 => "Matrix4x4f",
    256u32 => "MdFour",
    263u32 => "MonoBehaviour",
    277u32 => "MonoScript",
    288u32 => "m_ByteSize",
    299u32 => "m_Curve",
    307u32 => "m_EditorClassIdentifier",
    331u32 => "m_EditorHideFlags",
    349u32 => "m_Enabled",
    359u32 => "m_ExtensionPtr",
    374u32 => "m_GameObject",
    387u32 => "m_Index",
    395u32 => "m_IsArray",
    405u32 => "m_IsStatic",
    416u32 => "m_MetaFlag",
    427u32 => "m_Name",
    434u32 => "m_ObjectHideFlags",
    452u32 => "m_PrefabInternal",
    469u32 => "m_PrefabParentObject",
    490u32 => "m_Script",
    499u32 => "m_StaticEditorFlags",
    519u32 => "m_Type",
    526u32 => "m_Version",
    536u32 => "Object",
    543u32 => "pair",
    548u32 => "PPtr<Component>",
    564u32 => "PPtr<GameObject>",
    581u32 => "PPtr<Material>",
    596u32 => "PPtr<MonoBehaviour>",
    616u32 => "PPtr<MonoScript>",
    633u32 => "PPtr<Object>",
    646u32 => "PPtr<Prefab>",
    659u32 => "PPtr<Sprite>",
    672u32 => "PPtr<TextAsset>",
    688u32 => "PPtr<Texture>",
    702u32 => "PPtr<Texture2D>",
    718u32 => "PPtr<Transform>",
    734u32 => "Prefab",
    741u32 => "Quaternionf",
    753u32 => "Rectf",
    759u32 => "RectInt",
    767u32 => "RectOffset",
    778u32 => "second",
    785u32 => "set",
    789u32 => "short",
    795u32 => "size",
    800u32 => "SInt16",
    807u32 => "SInt32",
    814u32 => "SInt64",
    821u32 => "SInt8",
    827u32 => "staticvector",
    840u32 => "string",
    847u32 => "TextAsset",
    857u32 => "TextMesh",
    866u32 => "Texture",
    874u32 => "Texture2D",
    884u32 => "Transform",
    894u32 => "TypelessData",
    907u32 => "UInt16",
    914u32 => "UInt32",
    921u32 => "UInt64",
    928u32 => "UInt8",
    934u32 => "unsigned int",
    947u32 => "unsigned long long",
    966u32 => "unsigned short",
    981u32 => "vector",
    988u32 => "Vector2f",
    997u32 => "Vector3f",
    1006u32 => "Vector4f",
    1015u32 => "m_ScriptingClassIdentifier",
    1042u32 => "Gradient",
    1051u32 => "Type*",
};

/// Look up a built-in string by its offset
pub(crate) fn common_string(offset: u32) -> Option<&'static str> {
    COMMON_STRINGS.get(&offset).copied()
}

/// Offset of a built-in string, for writing compact type trees
#[cfg(test)]
pub(crate) fn common_offset(name: &str) -> Option<u32> {
    COMMON_STRINGS
        .entries()
        .find(|(_, s)| **s == name)
        .map(|(offset, _)| *offset)
}
