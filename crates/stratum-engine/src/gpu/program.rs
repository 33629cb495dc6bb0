use super::release::{Release, ReleaseQueue};
use super::{Backend, GpuError, ProgramKind, RawId};

/// A linked shader program. Immutable once linked.
#[derive(Debug)]
pub struct ShaderProgram {
    id: RawId,
    kind: ProgramKind,
    releases: ReleaseQueue,
}

impl ShaderProgram {
    pub(crate) fn link<B: Backend>(
        backend: &mut B,
        kind: ProgramKind,
        releases: &ReleaseQueue,
    ) -> Result<Self, GpuError> {
        let id = backend.create_program(kind)?;
        log::debug!("linked {} program ({id})", kind.name());
        Ok(Self { id, kind, releases: releases.clone() })
    }

    #[inline]
    pub fn id(&self) -> RawId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.releases.push(Release::Program(self.id));
    }
}

/// Every program the canvas needs, indexed by [`ProgramKind`].
#[derive(Debug, Default)]
pub struct Programs {
    programs: Vec<ShaderProgram>,
}

impl Programs {
    /// Links the full set. On failure, programs linked so far are deleted
    /// before the error is returned.
    pub(crate) fn link_all<B: Backend>(
        backend: &mut B,
        releases: &ReleaseQueue,
    ) -> Result<Self, GpuError> {
        let mut programs = Vec::with_capacity(ProgramKind::ALL.len());
        for kind in ProgramKind::ALL {
            match ShaderProgram::link(backend, kind, releases) {
                Ok(p) => programs.push(p),
                Err(err) => {
                    drop(programs);
                    for release in releases.take() {
                        if let Release::Program(id) = release {
                            backend.delete_program(id);
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(Self { programs })
    }

    #[inline]
    pub fn get(&self, kind: ProgramKind) -> Option<&ShaderProgram> {
        self.programs.get(kind.index())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ShaderProgram> {
        self.programs.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.programs.clear();
    }
}
