extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate lodge;

use std::cell::Cell;
use std::rc::Rc;

use lodge::errors::Error;
use lodge::res::prelude::*;
use lodge::utils::{HandleLike, HashValue};

#[derive(Default, Clone)]
struct Counters {
    loads: Rc<Cell<u32>>,
    frees: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
}

impl Counters {
    fn loads(&self) -> u32 {
        self.loads.get()
    }

    fn frees(&self) -> u32 {
        self.frees.get()
    }
}

struct Sources {
    counters: Counters,
    placeholder: Option<&'static str>,
}

impl AssetLoader<String> for Sources {
    fn load(&mut self, ctx: &LoadContext) -> Result<String, failure::Error> {
        self.counters.loads.set(self.counters.loads.get() + 1);

        if self.counters.fail.get() {
            return Err(format_err!("'{}' is not ready yet", ctx.name()));
        }

        Ok(format!("<{}>", ctx.name()))
    }

    fn load_default(&mut self, _: &LoadContext) -> Option<Result<String, failure::Error>> {
        self.placeholder.map(|v| Ok(v.to_owned()))
    }

    fn free(&mut self, _: String) {
        self.counters.frees.set(self.counters.frees.get() + 1);
    }
}

fn setup(names: &[&str]) -> (AssetLibrary, Vec<(AssetsId, Counters)>) {
    let _ = env_logger::try_init();

    let mut library = AssetLibrary::new();
    let mut registries = Vec::new();

    for name in names {
        let counters = Counters::default();
        let loader = Sources {
            counters: counters.clone(),
            placeholder: None,
        };

        let id = library.add_registry(name, loader).unwrap();
        registries.push((id, counters));
    }

    (library, registries)
}

#[test]
fn loads_lazily_and_once() {
    let (library, registries) = setup(&["shaders"]);
    let (shaders, ref counters) = registries[0];

    let asset = library.register(shaders, "foo.shader").unwrap();
    assert!(!library.is_loaded(shaders, asset));
    assert_eq!(counters.loads(), 0);

    assert_eq!(*library.get::<String>(shaders, asset).unwrap(), "<foo.shader>");
    assert_eq!(*library.get::<String>(shaders, asset).unwrap(), "<foo.shader>");
    assert_eq!(counters.loads(), 1);
    assert!(library.is_loaded(shaders, asset));

    library.invalidate(shaders, asset).unwrap();
    assert_eq!(counters.frees(), 1);
    assert!(!library.is_loaded(shaders, asset));

    library.get::<String>(shaders, asset).unwrap();
    assert_eq!(counters.loads(), 2);
}

#[test]
fn register_is_idempotent() {
    let (library, registries) = setup(&["shaders"]);
    let shaders = registries[0].0;

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(shaders, "b.shader").unwrap();
    assert_ne!(a, b);
    assert_eq!(library.len(shaders), 2);

    assert_eq!(library.register(shaders, "a.shader").unwrap(), a);
    assert_eq!(library.len(shaders), 2);

    assert_eq!(library.find_by_name(shaders, "b.shader"), Some(b));
    assert_eq!(library.find_by_name(shaders, "c.shader"), None);
    assert_eq!(
        library.find_by_name_hash(shaders, HashValue::from("a.shader")),
        Some(a)
    );

    assert_eq!(library.name(shaders, b), Some("b.shader".to_owned()));
    assert_eq!(
        library.name_hash(shaders, b),
        Some(HashValue::from("b.shader"))
    );
}

#[test]
fn failed_load_is_retried() {
    let (library, registries) = setup(&["shaders"]);
    let (shaders, ref counters) = registries[0];
    counters.fail.set(true);

    let asset = library.register(shaders, "foo.shader").unwrap();
    assert!(library.get::<String>(shaders, asset).is_none());
    assert!(!library.is_loaded(shaders, asset));

    match library.try_get::<String>(shaders, asset) {
        Err(Error::LoadFailed { ref name, .. }) => assert_eq!(name, "foo.shader"),
        _ => panic!("the loader fails"),
    }

    assert_eq!(counters.loads(), 2);

    counters.fail.set(false);
    library.invalidate(shaders, asset).unwrap();
    assert_eq!(counters.frees(), 0);

    assert_eq!(*library.get::<String>(shaders, asset).unwrap(), "<foo.shader>");
    assert_eq!(counters.loads(), 3);
}

#[test]
fn invalidation_reaches_every_listener() {
    let (library, registries) = setup(&["shaders", "materials"]);
    let (shaders, ref shader_counters) = registries[0];
    let (materials, ref material_counters) = registries[1];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(materials, "b.material").unwrap();
    let c = library.register(materials, "c.material").unwrap();

    library.add_listener(shaders, a, materials, b).unwrap();
    library.add_listener(shaders, a, materials, c).unwrap();
    library.add_listener(materials, b, materials, c).unwrap();

    for &(id, asset) in &[(shaders, a), (materials, b), (materials, c)] {
        library.get::<String>(id, asset).unwrap();
    }

    library.invalidate(shaders, a).unwrap();
    assert_eq!(shader_counters.frees(), 1);
    assert_eq!(material_counters.frees(), 2);

    assert!(!library.is_loaded(shaders, a));
    assert!(!library.is_loaded(materials, b));
    assert!(!library.is_loaded(materials, c));
}

#[test]
fn invalidation_is_transitive() {
    let (library, registries) = setup(&["files", "shaders", "materials"]);
    let (files, _) = registries[0];
    let (shaders, _) = registries[1];
    let (materials, ref counters) = registries[2];

    let file = library.register(files, "lit.glsl").unwrap();
    let shader = library.register(shaders, "lit.shader").unwrap();
    let material = library.register(materials, "brick.material").unwrap();

    library.add_listener(files, file, shaders, shader).unwrap();
    library.add_listener(shaders, shader, materials, material).unwrap();
    library.get::<String>(materials, material).unwrap();

    library.invalidate(files, file).unwrap();
    assert_eq!(counters.frees(), 1);
    assert!(!library.is_loaded(materials, material));
}

#[test]
fn listener_cycles_terminate() {
    let (library, registries) = setup(&["shaders"]);
    let (shaders, ref counters) = registries[0];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(shaders, "b.shader").unwrap();
    library.add_listener(shaders, a, shaders, b).unwrap();
    library.add_listener(shaders, b, shaders, a).unwrap();

    library.get::<String>(shaders, a).unwrap();
    library.get::<String>(shaders, b).unwrap();

    library.invalidate(shaders, a).unwrap();
    assert_eq!(counters.frees(), 2);

    library.get::<String>(shaders, b).unwrap();
    library.set(shaders, a, "patched".to_owned()).unwrap();
    assert_eq!(*library.get::<String>(shaders, a).unwrap(), "patched");
    assert!(!library.is_loaded(shaders, b));
}

#[test]
fn set_invalidates_listeners_only() {
    let (library, registries) = setup(&["shaders", "materials"]);
    let (shaders, ref shader_counters) = registries[0];
    let (materials, ref material_counters) = registries[1];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(materials, "b.material").unwrap();
    library.add_listener(shaders, a, materials, b).unwrap();
    library.get::<String>(materials, b).unwrap();

    library.set(shaders, a, "void main() {}".to_owned()).unwrap();
    assert_eq!(shader_counters.loads(), 0);
    assert_eq!(shader_counters.frees(), 0);
    assert_eq!(material_counters.frees(), 1);

    assert_eq!(*library.get::<String>(shaders, a).unwrap(), "void main() {}");
    assert_eq!(shader_counters.loads(), 0);
}

#[test]
fn first_load_does_not_notify_listeners() {
    let (library, registries) = setup(&["shaders", "materials"]);
    let (shaders, _) = registries[0];
    let (materials, ref counters) = registries[1];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(materials, "b.material").unwrap();
    library.add_listener(shaders, a, materials, b).unwrap();

    library.get::<String>(materials, b).unwrap();
    library.get::<String>(shaders, a).unwrap();

    assert_eq!(counters.frees(), 0);
    assert!(library.is_loaded(materials, b));
}

struct Chained {
    counters: Counters,
    dependency: Option<(AssetsId, &'static str)>,
}

impl AssetLoader<String> for Chained {
    fn load(&mut self, ctx: &LoadContext) -> Result<String, failure::Error> {
        self.counters.loads.set(self.counters.loads.get() + 1);

        match self.dependency {
            Some((id, name)) => {
                let asset = ctx.library().register(id, name)?;
                let source = ctx.load_dependency::<String>(id, asset)?;
                Ok(format!("{} <- {}", ctx.name(), *source))
            }
            None => Ok(ctx.name().to_owned()),
        }
    }

    fn free(&mut self, _: String) {
        self.counters.frees.set(self.counters.frees.get() + 1);
    }
}

#[test]
fn first_load_of_a_chain_does_not_notify_listeners() {
    let _ = env_logger::try_init();

    let mut library = AssetLibrary::new();
    let counters = vec![Counters::default(), Counters::default(), Counters::default()];

    let shaders = library
        .add_registry(
            "shaders",
            Chained {
                counters: counters[0].clone(),
                dependency: None,
            },
        )
        .unwrap();

    let materials = library
        .add_registry(
            "materials",
            Chained {
                counters: counters[1].clone(),
                dependency: Some((shaders, "a.shader")),
            },
        )
        .unwrap();

    let models = library
        .add_registry(
            "models",
            Chained {
                counters: counters[2].clone(),
                dependency: Some((materials, "b.material")),
            },
        )
        .unwrap();

    let c = library.register(models, "c.model").unwrap();
    assert_eq!(
        *library.get::<String>(models, c).unwrap(),
        "c.model <- b.material <- a.shader"
    );

    let a = library.find_by_name(shaders, "a.shader").unwrap();
    let b = library.find_by_name(materials, "b.material").unwrap();
    assert!(library.is_loaded(shaders, a));
    assert!(library.is_loaded(materials, b));

    for v in &counters {
        assert_eq!(v.loads(), 1);
        assert_eq!(v.frees(), 0);
    }

    library.invalidate(shaders, a).unwrap();
    for v in &counters {
        assert_eq!(v.frees(), 1);
    }

    assert!(!library.is_loaded(shaders, a));
    assert!(!library.is_loaded(materials, b));
    assert!(!library.is_loaded(models, c));

    library.get::<String>(models, c).unwrap();
    for v in &counters {
        assert_eq!(v.loads(), 2);
        assert_eq!(v.frees(), 1);
    }
}

#[test]
fn modify_and_reload() {
    let (library, registries) = setup(&["shaders", "materials"]);
    let (shaders, ref shader_counters) = registries[0];
    let (materials, ref material_counters) = registries[1];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(materials, "b.material").unwrap();
    library.add_listener(shaders, a, materials, b).unwrap();
    library.get::<String>(materials, b).unwrap();

    library
        .modify(shaders, a, |v: &mut String| v.push_str(" // edited"))
        .unwrap();
    assert_eq!(*library.get::<String>(shaders, a).unwrap(), "<a.shader> // edited");
    assert_eq!(material_counters.frees(), 1);

    library.get::<String>(materials, b).unwrap();
    library.reload(shaders, a).unwrap();
    assert_eq!(*library.get::<String>(shaders, a).unwrap(), "<a.shader>");
    assert_eq!(shader_counters.loads(), 2);
    assert_eq!(shader_counters.frees(), 0);
    assert_eq!(material_counters.frees(), 2);
}

#[test]
fn make_default() {
    let _ = env_logger::try_init();

    let mut library = AssetLibrary::new();
    let counters = Counters::default();
    let textures = library
        .add_registry(
            "textures",
            Sources {
                counters: counters.clone(),
                placeholder: Some("checkerboard"),
            },
        )
        .unwrap();
    let shaders = library
        .add_registry(
            "shaders",
            Sources {
                counters: counters.clone(),
                placeholder: None,
            },
        )
        .unwrap();

    let t1 = library.make_default(textures).unwrap();
    let t2 = library.make_default(textures).unwrap();
    assert_ne!(t1, t2);
    assert_eq!(library.name(textures, t1), Some("Unnamed 1".to_owned()));
    assert_eq!(library.name(textures, t2), Some("Unnamed 2".to_owned()));
    assert_eq!(*library.get::<String>(textures, t1).unwrap(), "checkerboard");
    assert_eq!(counters.loads(), 0);

    let s = library.make_default(shaders).unwrap();
    assert_eq!(*library.get::<String>(shaders, s).unwrap(), "<Unnamed 1>");
    assert_eq!(counters.loads(), 1);
}

#[test]
fn remove_listeners() {
    let (library, registries) = setup(&["shaders", "materials"]);
    let (shaders, _) = registries[0];
    let (materials, ref counters) = registries[1];

    let a = library.register(shaders, "a.shader").unwrap();
    let b = library.register(materials, "b.material").unwrap();
    let c = library.register(materials, "c.material").unwrap();

    library.add_listener(shaders, a, materials, b).unwrap();
    library.add_listener(shaders, a, materials, c).unwrap();
    library.add_listener(shaders, a, materials, c).unwrap();
    assert_eq!(
        library.listeners(shaders, a).unwrap(),
        vec![(materials, b), (materials, c)]
    );

    assert!(library.remove_listener(shaders, a, materials, b).unwrap());
    assert!(!library.remove_listener(shaders, a, materials, b).unwrap());
    assert!(library
        .remove_listener_by_name(shaders, a, materials, "c.material")
        .unwrap());
    assert!(!library
        .remove_listener_by_name(shaders, a, materials, "d.material")
        .unwrap());
    assert!(library.listeners(shaders, a).unwrap().is_empty());

    library.get::<String>(materials, b).unwrap();
    library.invalidate(shaders, a).unwrap();
    assert_eq!(counters.frees(), 0);
}

#[test]
fn loaders_track_dependencies() {
    let _ = env_logger::try_init();

    let mut library = AssetLibrary::new();
    let shaders = library
        .add_registry_with("shaders", |ctx| Ok(format!("<{}>", ctx.name())))
        .unwrap();

    let materials = library
        .add_registry_with("materials", move |ctx| {
            let shader = ctx.library().register(shaders, "base.shader")?;
            let source = ctx.load_dependency::<String>(shaders, shader)?;
            Ok(format!("{} with {}", ctx.name(), *source))
        })
        .unwrap();

    let material = library.register(materials, "brick.material").unwrap();
    assert_eq!(
        *library.get::<String>(materials, material).unwrap(),
        "brick.material with <base.shader>"
    );

    let shader = library.find_by_name(shaders, "base.shader").unwrap();
    assert_eq!(
        library.listeners(shaders, shader).unwrap(),
        vec![(materials, material)]
    );

    library.invalidate(shaders, shader).unwrap();
    assert!(!library.is_loaded(materials, material));
    assert!(!library.is_loaded(shaders, shader));
}

#[test]
fn loading_from_own_registry_is_reentrant() {
    let mut library = AssetLibrary::new();
    let id = library
        .add_registry_with("scenes", |ctx| {
            let other = ctx.library().register(ctx.id(), "other.scene")?;
            Ok(other.id())
        })
        .unwrap();

    let asset = library.register(id, "main.scene").unwrap();
    match library.try_get::<u32>(id, asset) {
        Err(Error::LoadFailed { .. }) => {}
        _ => panic!("the registry is busy loading"),
    }

    assert!(library.get::<u32>(id, asset).is_none());
    assert_eq!(library.len(id), 1);
}

#[test]
fn depending_on_own_registry_is_reentrant() {
    let mut library = AssetLibrary::new();
    let id = library
        .add_registry_with("shaders", |ctx| {
            let reentrant = match ctx.depends_on(ctx.id(), ctx.asset()) {
                Err(Error::Reentrant(_)) => true,
                _ => false,
            };

            Ok(reentrant)
        })
        .unwrap();

    let asset = library.register(id, "include.shader").unwrap();
    assert!(*library.get::<bool>(id, asset).unwrap());
    assert!(library.listeners(id, asset).unwrap().is_empty());
}

#[test]
fn userdata() {
    let mut library = AssetLibrary::new();
    let id = library
        .add_registry_with("scaled", |ctx| {
            let scale = ctx.userdata::<u32>(0).cloned().unwrap_or(1);
            Ok(ctx.name().len() as u32 * scale)
        })
        .unwrap();

    assert!(library.set_userdata(id, 0, Box::new(10u32)).unwrap().is_none());
    assert_eq!(*library.userdata::<u32>(id, 0).unwrap(), 10);
    assert!(library.userdata::<String>(id, 0).is_none());
    assert!(library.userdata::<u32>(id, 1).is_none());
    assert!(library.set_userdata(id, 16, Box::new(0u32)).is_err());

    let asset = library.register(id, "four").unwrap();
    assert_eq!(*library.get::<u32>(id, asset).unwrap(), 40);
}

#[test]
fn dropping_the_library_frees_payloads() {
    let counters;

    {
        let (library, registries) = setup(&["shaders"]);
        let (shaders, ref c) = registries[0];
        counters = c.clone();

        for name in &["a", "b", "c"] {
            let asset = library.register(shaders, name).unwrap();
            library.get::<String>(shaders, asset).unwrap();
        }
    }

    assert_eq!(counters.frees(), 3);
}
