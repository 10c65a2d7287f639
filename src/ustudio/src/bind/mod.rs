//! Binding decoded value graphs onto Rust types
//!
//! Each target type declares a [`Binding`] table once: which members take
//! part, the key each one answers to, and an optional [`Converter`]. The
//! table lives in a `once_cell` static and is shared by every bind call.
//!
//! ```
//! use once_cell::sync::Lazy;
//! use ustudio::bind::{bind, Binding, SchemaObject};
//! use ustudio::bind_object;
//!
//! #[derive(Debug, Default)]
//! struct Score {
//!     tempo: f64,
//!     numerator: i32,
//! }
//!
//! impl SchemaObject for Score {
//!     fn binding() -> &'static Binding<Self> {
//!         static BINDING: Lazy<Binding<Score>> = Lazy::new(|| {
//!             Binding::new("Score")
//!                 .member("Tempo", |s: &mut Score, v: f64| s.tempo = v)
//!                 .member("SignatureNumerator", |s: &mut Score, v: i32| s.numerator = v)
//!                 .rename("tsigNumerator")
//!         });
//!         &BINDING
//!     }
//! }
//! bind_object!(Score);
//! ```

mod convert;
mod naming;
mod types;

use tracing::trace;

pub use convert::{coerce, Converter, NumericConverter};
pub use naming::NamingConvention;
pub use types::{coerce_enum, coerce_primitive, TypeDesc};

use crate::value::Value;
use crate::{Error, Result};

/// Engine bookkeeping keys never bound to members
pub const IGNORED_KEYS: &[&str] = &["m_GameObject", "m_Enabled", "m_Script", "m_Name"];

/// Which declared members take part in binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Population {
    /// Only members marked with [`Binding::marked`]
    OptIn,
    /// Every member not excluded with [`Binding::ignored`]
    #[default]
    OptOut,
}

/// Where a value is being bound, for error reporting and conversion
#[derive(Clone, Copy)]
pub struct BindContext<'a> {
    /// Serialized key (or `key[index]` for elements)
    pub member: &'a str,
    pub converter: Option<&'a dyn Converter>,
}

impl<'a> BindContext<'a> {
    pub fn new(member: &'a str) -> Self {
        Self {
            member,
            converter: None,
        }
    }
}

/// A type that can be produced from a decoded [`Value`]
pub trait Bind: Sized {
    fn type_desc() -> TypeDesc;

    fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self>;
}

/// A struct with a binding table
///
/// Implement [`Bind`] for it with [`bind_object!`](crate::bind_object).
pub trait SchemaObject: Default + 'static {
    fn binding() -> &'static Binding<Self>;
}

type Setter<T> = Box<dyn Fn(&mut T, &Value, &BindContext<'_>) -> Result<()> + Send + Sync>;

/// One bindable member
pub struct Member<T> {
    name: &'static str,
    rename: Option<&'static str>,
    serialized: String,
    marked: bool,
    ignored: bool,
    converter: Option<Box<dyn Converter>>,
    desc: TypeDesc,
    set: Setter<T>,
}

impl<T> Member<T> {
    /// Name as declared
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Key this member answers to
    pub fn serialized_name(&self) -> &str {
        &self.serialized
    }

    pub fn declared_type(&self) -> &TypeDesc {
        &self.desc
    }

    /// Assign a decoded value to this member of `target`
    pub fn set(&self, target: &mut T, value: &Value) -> Result<()> {
        let ctx = BindContext {
            member: &self.serialized,
            converter: self.converter.as_deref(),
        };
        (self.set)(target, value, &ctx)
    }

    fn participates(&self, population: Population) -> bool {
        match population {
            Population::OptIn => self.marked,
            Population::OptOut => !self.ignored,
        }
    }
}

/// Per-type binding table
///
/// Built once with the chained methods below; the modifiers (`rename`,
/// `converter`, `marked`, `ignored`) apply to the most recently added
/// member.
pub struct Binding<T> {
    type_name: &'static str,
    population: Population,
    strict: bool,
    naming: NamingConvention,
    members: Vec<Member<T>>,
}

impl<T: 'static> Binding<T> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            population: Population::default(),
            strict: false,
            naming: NamingConvention::default(),
            members: Vec::new(),
        }
    }

    pub fn population(mut self, population: Population) -> Self {
        self.population = population;
        self
    }

    /// Fail on keys no member answers to instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        for member in &mut self.members {
            member.serialized = effective_name(naming, member.name, member.rename);
        }
        self
    }

    /// Add a member of type `F` assigned through `set`
    pub fn member<F, S>(mut self, name: &'static str, set: S) -> Self
    where
        F: Bind + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let setter: Setter<T> = Box::new(move |target: &mut T, value: &Value, ctx: &BindContext<'_>| {
            set(target, F::from_value(value, ctx)?);
            Ok(())
        });
        self.members.push(Member {
            name,
            rename: None,
            serialized: self.naming.apply(name),
            marked: false,
            ignored: false,
            converter: None,
            desc: F::type_desc(),
            set: setter,
        });
        self
    }

    /// Bind the last member under an explicit key
    pub fn rename(mut self, key: &'static str) -> Self {
        let naming = self.naming;
        if let Some(member) = self.members.last_mut() {
            member.rename = Some(key);
            member.serialized = effective_name(naming, member.name, member.rename);
        }
        self
    }

    /// Convert primitives for the last member when no built-in coercion applies
    pub fn converter(mut self, converter: impl Converter + 'static) -> Self {
        if let Some(member) = self.members.last_mut() {
            member.converter = Some(Box::new(converter));
        }
        self
    }

    /// Include the last member under [`Population::OptIn`]
    pub fn marked(mut self) -> Self {
        if let Some(member) = self.members.last_mut() {
            member.marked = true;
        }
        self
    }

    /// Exclude the last member under [`Population::OptOut`]
    pub fn ignored(mut self) -> Self {
        if let Some(member) = self.members.last_mut() {
            member.ignored = true;
        }
        self
    }
}

impl<T> Binding<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Members taking part under the type's population mode
    pub fn members(&self) -> impl Iterator<Item = &Member<T>> {
        self.members
            .iter()
            .filter(move |member| member.participates(self.population))
    }

    /// First participating member answering to `key`
    pub fn member_for(&self, key: &str) -> Option<&Member<T>> {
        self.members().find(|member| member.serialized == key)
    }
}

fn effective_name(naming: NamingConvention, name: &str, rename: Option<&str>) -> String {
    match rename {
        Some(key) => key.to_string(),
        None => naming.apply(name),
    }
}

/// Bind a decoded value onto `T`
pub fn bind<T: Bind>(value: &Value) -> Result<T> {
    let name = match value {
        Value::Object(obj) => obj.member_name.as_str(),
        _ => "",
    };
    T::from_value(value, &BindContext::new(name))
}

/// Bind an object onto `T`, also returning the keys that reached a member
pub fn bind_with_keys<T: SchemaObject>(value: &Value) -> Result<(T, Vec<String>)> {
    let mut keys = Vec::new();
    let target = bind_members(value, &BindContext::new(""), Some(&mut keys))?;
    Ok((target, keys))
}

/// Bind an object value through `T`'s binding table
pub fn bind_object<T: SchemaObject>(value: &Value, ctx: &BindContext<'_>) -> Result<T> {
    bind_members(value, ctx, None)
}

fn bind_members<T: SchemaObject>(
    value: &Value,
    ctx: &BindContext<'_>,
    mut bound: Option<&mut Vec<String>>,
) -> Result<T> {
    let binding = T::binding();
    let obj = match value {
        Value::Object(obj) if obj.as_array_wrapper().is_none() => obj,
        other => {
            return Err(Error::SchemaMismatch {
                member: ctx.member.to_string(),
                expected: binding.type_name.to_string(),
                found: types::shape(other),
            })
        }
    };

    let mut target = T::default();
    for (key, value) in obj.members.iter() {
        if IGNORED_KEYS.contains(&key) {
            trace!(type_name = binding.type_name, key, "skipping engine key");
            continue;
        }
        match binding.member_for(key) {
            Some(member) => {
                member.set(&mut target, value)?;
                if let Some(keys) = bound.as_deref_mut() {
                    keys.push(key.to_string());
                }
            }
            None if binding.strict => {
                return Err(Error::UnresolvedMember {
                    type_name: binding.type_name.to_string(),
                    key: key.to_string(),
                })
            }
            None => trace!(type_name = binding.type_name, key, "no member for key"),
        }
    }

    Ok(target)
}

/// Implement [`Bind`](crate::bind::Bind) for a [`SchemaObject`](crate::bind::SchemaObject) type
#[macro_export]
macro_rules! bind_object {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::bind::Bind for $ty {
                fn type_desc() -> $crate::bind::TypeDesc {
                    $crate::bind::TypeDesc::Object(
                        <$ty as $crate::bind::SchemaObject>::binding().type_name(),
                    )
                }

                fn from_value(
                    value: &$crate::Value,
                    ctx: &$crate::bind::BindContext<'_>,
                ) -> $crate::Result<Self> {
                    $crate::bind::bind_object(value, ctx)
                }
            }
        )+
    };
}

/// Declare a fieldless enum that binds from any integer width
///
/// ```
/// ustudio::bind_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
///     pub enum Difficulty {
///         #[default]
///         Easy = 0,
///         Hard = 2,
///     }
/// }
/// ```
#[macro_export]
macro_rules! bind_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),*
        }

        impl $crate::bind::Bind for $name {
            fn type_desc() -> $crate::bind::TypeDesc {
                $crate::bind::TypeDesc::Enum(stringify!($name))
            }

            fn from_value(
                value: &$crate::Value,
                ctx: &$crate::bind::BindContext<'_>,
            ) -> $crate::Result<Self> {
                let number = $crate::bind::coerce_enum(value, &Self::type_desc(), ctx)?;
                $(
                    if number == $value as i64 {
                        return Ok($name::$variant);
                    }
                )*
                Err($crate::Error::Conversion {
                    from: value.kind(),
                    to: format!("{} ({number})", stringify!($name)),
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use once_cell::sync::Lazy;

    use super::*;
    use crate::endian::Endian;
    use crate::testutil;
    use crate::value::{Members, Object, ValueKind};
    use crate::ErrorKind;

    bind_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        enum Flick {
            #[default]
            Flat = 0,
            Up = 1,
            Down = -1,
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        tick: i32,
        flick: Flick,
    }

    impl SchemaObject for Note {
        fn binding() -> &'static Binding<Self> {
            static BINDING: Lazy<Binding<Note>> = Lazy::new(|| {
                Binding::new("Note")
                    .member("m_Tick", |n: &mut Note, v: i32| n.tick = v)
                    .member("m_Flick", |n: &mut Note, v: Flick| n.flick = v)
            });
            &BINDING
        }
    }

    #[derive(Debug, Default)]
    struct Score {
        tempo: f64,
        numerator: i32,
        notes: Vec<Note>,
        title: String,
    }

    impl SchemaObject for Score {
        fn binding() -> &'static Binding<Self> {
            static BINDING: Lazy<Binding<Score>> = Lazy::new(|| {
                Binding::new("Score")
                    .member("Tempo", |s: &mut Score, v: f64| s.tempo = v)
                    .member("SignatureNumerator", |s: &mut Score, v: i32| s.numerator = v)
                    .rename("tsigNumerator")
                    .member("m_Notes", |s: &mut Score, v: Vec<Note>| s.notes = v)
                    .member("m_Title", |s: &mut Score, v: String| s.title = v)
            });
            &BINDING
        }
    }

    bind_object!(Note, Score);

    /// Declares only part of the score, with Rust-style names
    #[derive(Debug, Default)]
    struct Summary {
        tempo: f32,
        title: String,
    }

    impl SchemaObject for Summary {
        fn binding() -> &'static Binding<Self> {
            static BINDING: Lazy<Binding<Summary>> = Lazy::new(|| {
                Binding::new("Summary")
                    .naming(NamingConvention::SnakeToLowerCamel)
                    .member("tempo", |s: &mut Summary, v: f32| s.tempo = v)
                    .rename("Tempo")
                    .converter(NumericConverter)
                    .member("m_title", |s: &mut Summary, v: String| s.title = v)
                    .rename("m_Title")
            });
            &BINDING
        }
    }

    bind_object!(Summary);

    #[derive(Debug, Default)]
    struct Strict {
        tempo: f64,
    }

    impl SchemaObject for Strict {
        fn binding() -> &'static Binding<Self> {
            static BINDING: Lazy<Binding<Strict>> = Lazy::new(|| {
                Binding::new("Strict")
                    .strict(true)
                    .member("Tempo", |s: &mut Strict, v: f64| s.tempo = v)
            });
            &BINDING
        }
    }

    bind_object!(Strict);

    #[derive(Debug, Default)]
    struct OnlyTitle {
        tempo: f64,
        title: String,
    }

    impl SchemaObject for OnlyTitle {
        fn binding() -> &'static Binding<Self> {
            static BINDING: Lazy<Binding<OnlyTitle>> = Lazy::new(|| {
                Binding::new("OnlyTitle")
                    .population(Population::OptIn)
                    .member("Tempo", |s: &mut OnlyTitle, v: f64| s.tempo = v)
                    .member("m_Title", |s: &mut OnlyTitle, v: String| s.title = v)
                    .marked()
            });
            &BINDING
        }
    }

    bind_object!(OnlyTitle);

    fn decoded_score() -> anyhow::Result<Value> {
        let file = testutil::score_file(17, Endian::Little)?;
        Ok(file.decode_object(&file.objects[0])?)
    }

    fn object(members: Vec<(&str, Value)>) -> Value {
        let mut obj = Object::new("MonoBehaviour", "Base", 0);
        obj.members = members
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<Members>();
        Value::Object(obj)
    }

    #[test]
    fn test_direct_and_renamed_members() -> anyhow::Result<()> {
        let score: Score = bind(&decoded_score()?)?;
        assert_eq!(score.tempo, 120.0);
        assert_eq!(score.numerator, 4);
        assert_eq!(score.title, "Opening");
        assert_eq!(
            score.notes,
            vec![
                Note { tick: 0, flick: Flick::Flat },
                Note { tick: 480, flick: Flick::Up },
                Note { tick: 960, flick: Flick::Flat },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bound_keys_exclude_ignored_and_unmatched() -> anyhow::Result<()> {
        let value = decoded_score()?;
        let (_, keys) = bind_with_keys::<Summary>(&value)?;

        let decoded: BTreeSet<&str> = value.as_object().unwrap().members.keys().collect();
        let expected: BTreeSet<&str> = decoded
            .iter()
            .copied()
            .filter(|key| !IGNORED_KEYS.contains(key))
            .filter(|key| Summary::binding().member_for(key).is_some())
            .collect();
        let bound: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
        assert_eq!(bound, expected);
        assert_eq!(bound, BTreeSet::from(["Tempo", "m_Title"]));
        Ok(())
    }

    #[test]
    fn test_converter_narrows_double() -> anyhow::Result<()> {
        let summary: Summary = bind(&decoded_score()?)?;
        assert_eq!(summary.tempo, 120.0f32);
        assert_eq!(summary.title, "Opening");
        Ok(())
    }

    #[test]
    fn test_without_converter_narrowing_fails() {
        let value = object(vec![("Tempo", Value::Double(1.0))]);
        #[derive(Debug, Default)]
        struct Narrow(f32);
        impl SchemaObject for Narrow {
            fn binding() -> &'static Binding<Self> {
                static BINDING: Lazy<Binding<Narrow>> =
                    Lazy::new(|| Binding::new("Narrow").member("Tempo", |n: &mut Narrow, v: f32| n.0 = v));
                &BINDING
            }
        }
        bind_object!(Narrow);

        let err = bind::<Narrow>(&value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let value = object(vec![
            ("m_Name", Value::String("x".into())),
            ("Tempo", Value::Double(90.0)),
            ("evts", Value::SInt32(0)),
        ]);
        let err = bind::<Strict>(&value).unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedMember { ref type_name, ref key } if type_name == "Strict" && key == "evts"
        ));
        assert_eq!(err.kind(), ErrorKind::UnresolvedMember);

        // Ignored keys never count as unmatched
        let value = object(vec![("m_Enabled", Value::UInt8(1)), ("Tempo", Value::Double(90.0))]);
        assert_eq!(bind::<Strict>(&value).unwrap().tempo, 90.0);
    }

    #[test]
    fn test_opt_in_binds_marked_only() {
        let value = object(vec![
            ("Tempo", Value::Double(90.0)),
            ("m_Title", Value::String("Finale".into())),
        ]);
        let only: OnlyTitle = bind(&value).unwrap();
        assert_eq!(only.tempo, 0.0);
        assert_eq!(only.title, "Finale");
        assert_eq!(OnlyTitle::binding().members().count(), 1);
    }

    #[test]
    fn test_ignored_member_under_opt_out() {
        #[derive(Debug, Default)]
        struct Partial {
            tempo: f64,
            title: String,
        }
        impl SchemaObject for Partial {
            fn binding() -> &'static Binding<Self> {
                static BINDING: Lazy<Binding<Partial>> = Lazy::new(|| {
                    Binding::new("Partial")
                        .member("Tempo", |p: &mut Partial, v: f64| p.tempo = v)
                        .ignored()
                        .member("m_Title", |p: &mut Partial, v: String| p.title = v)
                });
                &BINDING
            }
        }
        bind_object!(Partial);

        let value = object(vec![
            ("Tempo", Value::Double(90.0)),
            ("m_Title", Value::String("Finale".into())),
        ]);
        let partial: Partial = bind(&value).unwrap();
        assert_eq!(partial.tempo, 0.0);
        assert_eq!(partial.title, "Finale");
    }

    #[test]
    fn test_bool_from_byte_is_idempotent() {
        #[derive(Debug, Default)]
        struct Toggle(bool);
        impl SchemaObject for Toggle {
            fn binding() -> &'static Binding<Self> {
                static BINDING: Lazy<Binding<Toggle>> =
                    Lazy::new(|| Binding::new("Toggle").member("m_On", |t: &mut Toggle, v: bool| t.0 = v));
                &BINDING
            }
        }
        bind_object!(Toggle);

        for (byte, expected) in [(0u8, false), (1, true), (7, true)] {
            let toggle: Toggle = bind(&object(vec![("m_On", Value::UInt8(byte))])).unwrap();
            assert_eq!(toggle.0, expected);
        }
        let toggle: Toggle = bind(&object(vec![("m_On", Value::Bool(true))])).unwrap();
        assert!(toggle.0);
    }

    #[test]
    fn test_enum_from_integers() {
        for (value, expected) in [
            (Value::UInt8(1), Flick::Up),
            (Value::SInt32(-1), Flick::Down),
            (Value::SInt64(0), Flick::Flat),
        ] {
            assert_eq!(bind::<Flick>(&value).unwrap(), expected);
        }
        let err = bind::<Flick>(&Value::SInt32(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        assert_eq!(Flick::type_desc(), TypeDesc::Enum("Flick"));
    }

    #[test]
    fn test_array_into_scalar_member() {
        let mut wrapper = Object::new("vector", "m_Notes", 0);
        wrapper.members.insert("Array", Value::List(vec![]));
        let value = object(vec![("Tempo", Value::Object(wrapper))]);

        let err = bind::<Score>(&value).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaMismatch { ref member, .. } if member == "Tempo"
        ));
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_naming_conventions_apply_without_rename() {
        let binding = Binding::<Summary>::new("Names")
            .member("note_count", |_: &mut Summary, _: i32| {})
            .naming(NamingConvention::SnakeToLowerCamel)
            .member("first_tick", |_: &mut Summary, _: i32| {})
            .member("SecondTick", |_: &mut Summary, _: i32| {})
            .rename("tick2");
        let names: Vec<&str> = binding.members().map(Member::serialized_name).collect();
        assert_eq!(names, vec!["noteCount", "firstTick", "tick2"]);
        assert!(binding.member_for("noteCount").is_some());
        assert_eq!(
            binding.member_for("firstTick").unwrap().declared_type(),
            &TypeDesc::Primitive(ValueKind::SInt32)
        );
    }

    #[test]
    fn test_descriptors_of_objects() {
        assert_eq!(Score::type_desc(), TypeDesc::Object("Score"));
        assert_eq!(Vec::<Note>::type_desc().to_string(), "Note[]");
    }
}
